//! # PDF Reports
//!
//! Renders calculation outcomes and whole projects to PDF using Typst.
//!
//! ## Architecture
//!
//! - Typst source is built by pure functions ([`outcome_source`],
//!   [`project_source`]) so the markup can be tested without compiling
//! - User text is escaped before it is spliced into markup
//! - Only the fonts bundled with `typst-assets` are used; they are loaded
//!   once per process
//! - Output is raw PDF bytes (`Vec<u8>`)
//!
//! ## Example
//!
//! ```rust,no_run
//! use calc_core::project::Project;
//! use calc_core::report::render_project_pdf;
//!
//! let project = Project::new("A. Seitkali", "Tank farm", "KazTrans LLP");
//! let pdf = render_project_pdf(&project).unwrap();
//! std::fs::write("tank-farm.pdf", pdf).unwrap();
//! ```

use chrono::{Datelike, Utc};
use once_cell::sync::Lazy;
use tracing::info;
use typst::diag::{FileError, FileResult};
use typst::foundations::{Bytes, Datetime};
use typst::syntax::{FileId, Source};
use typst::text::{Font, FontBook};
use typst::utils::LazyHash;
use typst::{Library, LibraryExt, World};
use typst_pdf::PdfOptions;

use crate::calculations::evacuation::EvacuationResult;
use crate::calculations::fire_risk::FireRiskResult;
use crate::calculations::ngps::NgpsResult;
use crate::calculations::{CalculationOutcome, CalculatorKind};
use crate::errors::{CalcError, CalcResult};
use crate::formulas::{Formula, FormulaCategory};
use crate::project::Project;
use crate::settings::{GlobalSettings, NgpsPolicy};

// ============================================================================
// Typst World Implementation
// ============================================================================

static FONTS: Lazy<Vec<Font>> = Lazy::new(|| {
    typst_assets::fonts()
        .flat_map(|data| Font::iter(Bytes::new(data)))
        .collect()
});

/// A minimal Typst world for compiling one in-memory document.
struct ReportWorld {
    main: Source,
    book: LazyHash<FontBook>,
    library: LazyHash<Library>,
}

impl ReportWorld {
    fn new(source: String) -> Self {
        ReportWorld {
            main: Source::detached(source),
            book: LazyHash::new(FontBook::from_fonts(FONTS.iter())),
            library: LazyHash::new(Library::default()),
        }
    }
}

impl World for ReportWorld {
    fn library(&self) -> &LazyHash<Library> {
        &self.library
    }

    fn book(&self) -> &LazyHash<FontBook> {
        &self.book
    }

    fn main(&self) -> FileId {
        self.main.id()
    }

    fn source(&self, id: FileId) -> FileResult<Source> {
        if id == self.main.id() {
            Ok(self.main.clone())
        } else {
            Err(FileError::NotFound(id.vpath().as_rootless_path().into()))
        }
    }

    fn file(&self, id: FileId) -> FileResult<Bytes> {
        Err(FileError::NotFound(id.vpath().as_rootless_path().into()))
    }

    fn font(&self, index: usize) -> Option<Font> {
        FONTS.get(index).cloned()
    }

    fn today(&self, _offset: Option<i64>) -> Option<Datetime> {
        let now = Utc::now();
        Datetime::from_ymd(now.year(), now.month() as u8, now.day() as u8)
    }
}

/// Compile Typst source to PDF bytes.
fn compile_pdf(source: String) -> CalcResult<Vec<u8>> {
    let world = ReportWorld::new(source);

    let document = typst::compile(&world).output.map_err(|errors| {
        let messages: Vec<String> = errors.iter().map(|e| e.message.to_string()).collect();
        CalcError::ReportFailed {
            reason: format!("Typst compilation failed: {}", messages.join("; ")),
        }
    })?;

    let bytes = typst_pdf::pdf(&document, &PdfOptions::default()).map_err(|errors| {
        let messages: Vec<String> = errors.iter().map(|e| e.message.to_string()).collect();
        CalcError::ReportFailed {
            reason: format!("PDF rendering failed: {}", messages.join("; ")),
        }
    })?;

    info!(bytes = bytes.len(), "report rendered");
    Ok(bytes)
}

// ============================================================================
// Source Builders
// ============================================================================

/// Title block data printed on every report.
#[derive(Debug, Clone, Default)]
pub struct ReportHeader {
    pub engineer: String,
    pub facility: String,
    pub organization: String,
    /// Report date, `YYYY-MM-DD`
    pub date: String,
}

impl ReportHeader {
    pub fn new(engineer: impl Into<String>, facility: impl Into<String>, organization: impl Into<String>) -> Self {
        ReportHeader {
            engineer: engineer.into(),
            facility: facility.into(),
            organization: organization.into(),
            date: Utc::now().format("%Y-%m-%d").to_string(),
        }
    }

    pub fn for_project(project: &Project) -> Self {
        ReportHeader::new(
            project.meta.engineer.clone(),
            project.meta.facility.clone(),
            project.meta.organization.clone(),
        )
    }
}

const PREAMBLE: &str = r##"#set page(
  paper: "a4",
  margin: (top: 2cm, bottom: 2cm, left: 2.5cm, right: 1.5cm),
  header: align(right)[#text(size: 9pt, fill: gray)[Ortcalc fire-safety calculations]],
  footer: context [
    #line(length: 100%, stroke: 0.5pt + gray)
    #grid(
      columns: (1fr, 1fr, 1fr),
      align(left)[#text(size: 9pt)[{{FACILITY}}]],
      align(center)[#text(size: 9pt)[Page #counter(page).display()]],
      align(right)[#text(size: 9pt)[{{DATE}}]],
    )
  ]
)
#set text(font: "Libertinus Serif", size: 11pt)
#set heading(numbering: "1.1")

#align(center)[
  #block(width: 100%, fill: rgb("#f0f0f0"), inset: 12pt, radius: 4pt)[
    #text(size: 18pt, weight: "bold")[{{TITLE}}]
    #v(4pt)
    #text(size: 13pt)[{{FACILITY}}]
  ]
]

#table(
  columns: (auto, 1fr),
  stroke: none,
  [Engineer:], [{{ENGINEER}}],
  [Organization:], [{{ORGANIZATION}}],
  [Date:], [{{DATE}}],
)

#line(length: 100%, stroke: 0.5pt)
"##;

const FOOTNOTE: &str = r##"
#v(16pt)
#line(length: 100%, stroke: 0.5pt)
#text(size: 9pt, fill: gray)[
  Generated by Ortcalc. Estimates support, and do not replace, the assessment of a qualified fire-safety engineer.
]
"##;

fn preamble(title: &str, header: &ReportHeader) -> String {
    let organization = if header.organization.trim().is_empty() {
        "not specified".to_string()
    } else {
        escape_typst(&header.organization)
    };
    PREAMBLE
        .replace("{{TITLE}}", &escape_typst(title))
        .replace("{{FACILITY}}", &escape_typst(&header.facility))
        .replace("{{ENGINEER}}", &escape_typst(&header.engineer))
        .replace("{{ORGANIZATION}}", &organization)
        .replace("{{DATE}}", &escape_typst(&header.date))
}

/// Typst source for a single calculation computed under `settings`.
pub fn outcome_source(
    label: &str,
    outcome: &CalculationOutcome,
    header: &ReportHeader,
    settings: &GlobalSettings,
) -> String {
    let mut source = preamble(&format!("{} Calculation", outcome.kind().display_name()), header);
    source.push_str(&outcome_section(label, outcome, settings));
    source.push_str(&formula_appendix(&[outcome.kind()]));
    source.push_str(FOOTNOTE);
    source
}

/// Typst source for a whole project: summary table, one section per item,
/// formula appendix.
pub fn project_source(project: &Project, header: &ReportHeader) -> String {
    let evaluated = project.evaluate();
    let mut source = preamble("Fire-Safety Assessment", header);

    source.push_str("\n= Summary\n\n");
    if evaluated.is_empty() {
        source.push_str("The project contains no calculations.\n");
    } else {
        source.push_str(
            "#table(\n  columns: (auto, 1fr, auto, 2fr),\n  inset: 6pt,\n  stroke: 0.5pt,\n  \
             table.header([*\\#*], [*Item*], [*Type*], [*Result*]),\n",
        );
        for (i, entry) in evaluated.iter().enumerate() {
            let verdict = match &entry.outcome {
                Ok(outcome) if outcome.needs_attention() => format!("*{}*", escape_typst(&outcome.headline())),
                Ok(outcome) => escape_typst(&outcome.headline()),
                Err(e) => format!("_Not calculated: {}_", escape_typst(&e.to_string())),
            };
            source.push_str(&format!(
                "  [{}], [{}], [{}], [{}],\n",
                i + 1,
                escape_typst(entry.item.label()),
                escape_typst(entry.item.calc_type()),
                verdict
            ));
        }
        source.push_str(")\n");
    }

    let mut kinds: Vec<CalculatorKind> = Vec::new();
    for entry in &evaluated {
        match &entry.outcome {
            Ok(outcome) => {
                if !kinds.contains(&outcome.kind()) {
                    kinds.push(outcome.kind());
                }
                source.push_str("\n#pagebreak()\n");
                source.push_str(&outcome_section(entry.item.label(), outcome, &project.settings));
            }
            Err(_) => continue,
        }
    }

    source.push_str(&formula_appendix(&kinds));
    source.push_str(FOOTNOTE);
    source
}

fn outcome_section(label: &str, outcome: &CalculationOutcome, settings: &GlobalSettings) -> String {
    let title = if label.trim().is_empty() {
        outcome.kind().display_name().to_string()
    } else {
        format!("{}: {}", outcome.kind().display_name(), label)
    };
    let mut out = format!("\n= {}\n\n", escape_typst(&title));
    match outcome {
        CalculationOutcome::Evacuation(r) => out.push_str(&evacuation_body(r)),
        CalculationOutcome::FireRisk(r) => out.push_str(&fire_risk_body(r)),
        CalculationOutcome::Ngps(r) => out.push_str(&ngps_body(r, &settings.ngps)),
    }
    out.push_str(&verdict_box(&outcome.headline(), outcome.needs_attention()));
    out
}

fn evacuation_body(r: &EvacuationResult) -> String {
    let mut out = String::from(
        "== Route Throughput\n\n#table(\n  columns: (1fr, auto, auto),\n  inset: 6pt,\n  stroke: 0.5pt,\n  \
         align: (left, right, center),\n  table.header([*Segment*], [*People/min*], [*Bottleneck*]),\n",
    );
    for (segment, throughput) in &r.per_segment_throughput {
        out.push_str(&format!(
            "  [{}], [{:.1}], [{}],\n",
            segment.display_name(),
            throughput,
            if *segment == r.bottleneck { "X" } else { "" }
        ));
    }
    out.push_str(")\n\n== Evacuation Time\n\n");
    out.push_str(&format!(
        "#table(\n  columns: (1fr, auto),\n  inset: 6pt,\n  stroke: 0.5pt,\n  align: (left, right),\n  \
         [Queue at bottleneck], [{:.2} min],\n  [Corridor walk], [{:.2} min],\n  [Stair descent], [{:.2} min],\n  \
         [Smoke multiplier], [{:.2}],\n  [Mobility multiplier], [{:.2}],\n  [*Evacuation time*], [*{:.2} min*],\n  \
         [Permissible time], [{:.0} min],\n  [Margin], [{:+.2} min],\n  [Status], [*{}*],\n)\n\n",
        r.queue_time_min,
        r.horizontal_time_min,
        r.stair_time_min,
        r.smoke_multiplier,
        r.mobility_multiplier,
        r.evacuation_time_min,
        r.required_time_min,
        r.margin_min(),
        r.status.display_name()
    ));
    out.push_str(&bullet_list("Recommendations", &r.recommendations));
    out
}

fn fire_risk_body(r: &FireRiskResult) -> String {
    let mut out = String::from(
        "== Risk Factors\n\n#table(\n  columns: (1fr, auto, auto, auto, auto),\n  inset: 6pt,\n  stroke: 0.5pt,\n  \
         align: (left, right, right, right, right),\n  \
         table.header([*Factor*], [*Value*], [*Max*], [*Weight*], [*Points*]),\n",
    );
    for factor in &r.factors {
        out.push_str(&format!(
            "  [{}], [{:.2}], [{:.0}], [{:.2}], [{:.2}],\n",
            escape_typst(&factor.name),
            factor.value,
            factor.max_value,
            factor.weight,
            factor.contribution
        ));
    }
    out.push_str(&format!(
        "  table.cell(colspan: 4)[*Total (0 to 100)*], [*{:.1}*],\n)\n\nRisk level: *{}*\n\n",
        r.total_risk,
        r.risk_level.display_name()
    ));
    out.push_str(&bullet_list("Recommendations", &r.recommendations));
    out
}

fn ngps_body(r: &NgpsResult, policy: &NgpsPolicy) -> String {
    let yes_no = |b: bool| if b { "yes" } else { "no" };
    let mut out = format!(
        "== Determination\n\n#table(\n  columns: (1fr, auto),\n  inset: 6pt,\n  stroke: 0.5pt,\n  align: (left, right),\n  \
         [NGPS mandatory], [{}],\n  [Fire post recommended], [{}],\n  [Unit], [{}],\n  [Fire engines], [{}],\n  \
         [Staff per shift], [{}],\n  [Staff, 3-shift roster], [{}],\n  [Staff, 4-shift roster], [{}],\n)\n\n\
         == Large-Area Policy\n\n#table(\n  columns: (1fr, auto),\n  inset: 6pt,\n  stroke: 0.5pt,\n  align: (left, right),\n  \
         [Area threshold $S_\"thr\"$], [{} m²],\n  [Minimum fire engines above threshold $v_\"min\"$], [{}],\n)\n\n",
        yes_no(r.required),
        yes_no(r.is_post),
        r.unit_type.display_name(),
        r.vehicle_count,
        r.staff_per_shift,
        r.staff_for_3_shifts,
        r.staff_for_4_shifts,
        policy.large_area_threshold_m2,
        policy.large_area_min_vehicles
    );
    out.push_str(&bullet_list("Details", &r.details));
    out.push_str(&format!("_Basis:_ {}\n\n", escape_typst(&r.justification)));
    out
}

fn bullet_list(title: &str, items: &[String]) -> String {
    if items.is_empty() {
        return String::new();
    }
    let mut out = format!("== {}\n\n", escape_typst(title));
    for item in items {
        out.push_str(&format!("- {}\n", escape_typst(item)));
    }
    out.push('\n');
    out
}

fn verdict_box(headline: &str, attention: bool) -> String {
    let fill = if attention { "#f8d7da" } else { "#d4edda" };
    format!(
        "#align(center)[\n  #block(fill: rgb(\"{}\"), inset: 12pt, radius: 4pt)[\n    \
         #text(size: 13pt, weight: \"bold\")[{}]\n  ]\n]\n",
        fill,
        escape_typst(headline)
    )
}

fn formula_appendix(kinds: &[CalculatorKind]) -> String {
    if kinds.is_empty() {
        return String::new();
    }
    let mut out = String::from("\n#pagebreak()\n= Appendix: Formulas\n\n");
    for category in FormulaCategory::ALL {
        let included = kinds.iter().any(|k| formula_category(*k) == category);
        if !included {
            continue;
        }
        out.push_str(&format!("== {}\n\n", category.display_name()));
        for formula in Formula::in_category(category) {
            let meta = formula.metadata();
            out.push_str(&format!(
                "*{}.* {}\n\n{}\n\n#text(size: 9pt, fill: gray)[{}]\n\n",
                escape_typst(meta.name),
                escape_typst(meta.description),
                meta.formula_typst,
                escape_typst(&meta.reference.citation())
            ));
        }
    }
    out
}

fn formula_category(kind: CalculatorKind) -> FormulaCategory {
    match kind {
        CalculatorKind::Evacuation => FormulaCategory::Evacuation,
        CalculatorKind::FireRisk => FormulaCategory::FireRisk,
        CalculatorKind::Ngps => FormulaCategory::Ngps,
    }
}

/// Escape characters with meaning in Typst markup
pub fn escape_typst(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '*' | '_' | '#' | '$' | '@' | '<' | '>' | '\\' | '`' | '[' | ']' | '/' | '=' | '-' | '+' | '~' => {
                out.push('\\');
                out.push(c);
            }
            '\n' | '\r' => out.push(' '),
            _ => out.push(c),
        }
    }
    out
}

// ============================================================================
// PDF Rendering Functions
// ============================================================================

/// Render one calculation to PDF.
///
/// # Returns
///
/// * `Ok(Vec<u8>)` - PDF file as bytes
/// * `Err(CalcError::ReportFailed)` - Typst compilation or export failed
pub fn render_outcome_pdf(
    label: &str,
    outcome: &CalculationOutcome,
    header: &ReportHeader,
    settings: &GlobalSettings,
) -> CalcResult<Vec<u8>> {
    compile_pdf(outcome_source(label, outcome, header, settings))
}

/// Render an entire project to a single PDF.
///
/// Items that fail validation are listed in the summary but get no section.
pub fn render_project_pdf(project: &Project) -> CalcResult<Vec<u8>> {
    info!(
        facility = %project.meta.facility,
        items = project.item_count(),
        "rendering project report"
    );
    compile_pdf(project_source(project, &ReportHeader::for_project(project)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculations::ngps::{IndustryType, NgpsInput};
    use crate::calculations::{parse_form, CalculationItem};
    use crate::category::HazardCategory;
    use crate::settings::GlobalSettings;

    const OFFICE: &str = r#"{
        "label": "Office, 3rd floor", "peopleCount": 150, "buildingType": "office",
        "doorWidthM": 1.2, "corridorWidthM": 2.0, "corridorLengthM": 30,
        "stairWidthM": 1.5, "stairFlights": 3, "exitWidthM": 2.0
    }"#;

    const WAREHOUSE: &str = r#"{
        "label": "Warehouse #2 [north]", "buildingType": "warehouse", "category": "V",
        "areaM2": 2400, "occupancy": 12, "floors": 1, "hasFireDetection": true,
        "hasFireBarriers": true, "hasExtinguishers": true, "electricalLoadKw": 120,
        "maintenanceQuality": 3, "staffTraining": 4
    }"#;

    fn header() -> ReportHeader {
        ReportHeader {
            engineer: "Test Engineer".to_string(),
            facility: "Test_Site".to_string(),
            organization: String::new(),
            date: "2025-01-31".to_string(),
        }
    }

    fn sample_project() -> Project {
        let mut project = Project::new("Test Engineer", "Depot", "Acme LLP");
        project.add_item(parse_form(CalculatorKind::Evacuation, OFFICE).unwrap());
        project.add_item(parse_form(CalculatorKind::FireRisk, WAREHOUSE).unwrap());
        project.add_item(CalculationItem::Ngps(NgpsInput {
            label: "Depot".to_string(),
            industry_type: IndustryType::FuelDepot,
            area_m2: 6_000,
            category: HazardCategory::A,
            distance_to_station_km: 12.0,
        }));
        project
    }

    #[test]
    fn test_escape_typst() {
        assert_eq!(escape_typst("Warehouse #2 [north]"), "Warehouse \\#2 \\[north\\]");
        assert_eq!(escape_typst("a*b_c"), "a\\*b\\_c");
        assert_eq!(escape_typst("http://x"), "http:\\/\\/x");
        assert_eq!(escape_typst("two\nlines"), "two lines");
    }

    #[test]
    fn test_outcome_source() {
        let item = parse_form(CalculatorKind::Evacuation, OFFICE).unwrap();
        let outcome = item.calculate(&GlobalSettings::default()).unwrap();
        let source = outcome_source(item.label(), &outcome, &header(), &GlobalSettings::default());

        assert!(source.contains("Evacuation time Calculation"));
        assert!(source.contains("Test\\_Site"));
        assert!(source.contains("[Organization:], [not specified]"));
        assert!(source.contains("[door], [72.0], [X],"));
        assert!(source.contains("*Evacuation time*"));
        assert!(source.contains("[Margin], [+"));
        assert!(source.contains("= Appendix: Formulas"));
        assert!(source.contains("== Evacuation Time"));
        assert!(!source.contains("== Fire Risk"));
        assert!(!source.contains("{{"));
    }

    #[test]
    fn test_project_source() {
        let project = sample_project();
        let source = project_source(&project, &header());

        assert!(source.contains("= Summary"));
        assert!(source.contains("Warehouse \\#2 \\[north\\]"));
        assert!(source.contains("== Risk Factors"));
        assert!(source.contains("[Fire engines], [1],"));
        assert!(source.contains("== NGPS Determination"));
        assert!(source.contains("[10000 m²],"));
        assert_eq!(source.matches("#pagebreak()").count(), 4);
    }

    #[test]
    fn test_project_policy_in_ngps_section() {
        let mut project = Project::new("E", "Site", "");
        project.settings.ngps = NgpsPolicy {
            large_area_threshold_m2: 5_000,
            large_area_min_vehicles: 3,
        };
        project.add_item(CalculationItem::Ngps(NgpsInput {
            label: "Depot".to_string(),
            industry_type: IndustryType::FuelDepot,
            area_m2: 8_000,
            category: HazardCategory::B,
            distance_to_station_km: 2.0,
        }));
        let source = project_source(&project, &header());

        assert!(source.contains("== Large-Area Policy"));
        assert!(source.contains("[5000 m²],"));
        assert!(source.contains("$v_\"min\"$], [3],"));
        assert!(source.contains("[Fire engines], [3],"));
        assert!(source.contains("S_\"thr\""));
    }

    #[test]
    fn test_invalid_items_listed_not_rendered() {
        let mut project = Project::new("E", "Site", "");
        project.add_item(CalculationItem::Ngps(NgpsInput {
            label: "Broken".to_string(),
            industry_type: IndustryType::Other,
            area_m2: 0,
            category: HazardCategory::A,
            distance_to_station_km: 1.0,
        }));
        let source = project_source(&project, &header());
        assert!(source.contains("Not calculated"));
        assert!(!source.contains("#pagebreak()"));
    }

    #[test]
    fn test_empty_project_source() {
        let source = project_source(&Project::new("E", "Site", ""), &header());
        assert!(source.contains("The project contains no calculations."));
        assert!(!source.contains("Appendix"));
    }

    #[test]
    fn test_pdf_generation() {
        let pdf = render_project_pdf(&sample_project());
        assert!(pdf.is_ok(), "PDF generation failed: {:?}", pdf.err());

        let pdf_bytes = pdf.unwrap();
        assert!(pdf_bytes.starts_with(b"%PDF"), "Output is not a valid PDF");
        assert!(pdf_bytes.len() > 1000, "PDF seems too small");
    }

    #[test]
    fn test_single_outcome_pdf() {
        let item = parse_form(CalculatorKind::FireRisk, WAREHOUSE).unwrap();
        let outcome = item.calculate(&GlobalSettings::default()).unwrap();
        let pdf = render_outcome_pdf(item.label(), &outcome, &header(), &GlobalSettings::default()).unwrap();
        assert!(pdf.starts_with(b"%PDF"));
    }
}
