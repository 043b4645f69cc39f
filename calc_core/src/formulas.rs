//! # Formula Registry
//!
//! Every formula the calculators apply, with its regulatory source and
//! variables. The registry feeds the report appendix and `FORMULAS.md`,
//! so a reviewer can audit the arithmetic without reading the code.
//!
//! ```rust
//! use calc_core::formulas::{Formula, FormulaCategory};
//!
//! let meta = Formula::EvacuationTime.metadata();
//! assert_eq!(meta.category, FormulaCategory::Evacuation);
//! println!("{} ({})", meta.formula_plain, meta.reference.citation());
//! ```

use serde::{Deserialize, Serialize};

// ============================================================================
// Norm References
// ============================================================================

/// Source of a formula or constant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NormReference {
    /// Construction norms of the Republic of Kazakhstan
    SnRk { number: &'static str, section: &'static str },
    /// Code of practice (SP RK)
    SpRk { number: &'static str, section: &'static str },
    /// Technical Regulation "General Requirements for Fire Safety"
    TechnicalRegulation { section: &'static str },
    /// Law "On Civil Protection"
    CivilProtectionLaw { article: &'static str },
    /// Engineering estimate with no normative source
    Methodology,
}

impl NormReference {
    /// Format the reference for display in reports
    pub fn citation(&self) -> String {
        match self {
            NormReference::SnRk { number, section } => format!("SN RK {}, {}", number, section),
            NormReference::SpRk { number, section } => format!("SP RK {}, {}", number, section),
            NormReference::TechnicalRegulation { section } => {
                format!("Technical Regulation \"General Requirements for Fire Safety\", {}", section)
            }
            NormReference::CivilProtectionLaw { article } => {
                format!("Law of the RK \"On Civil Protection\", {}", article)
            }
            NormReference::Methodology => "Engineering method (no normative source)".to_string(),
        }
    }
}

// ============================================================================
// Categories and variables
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FormulaCategory {
    Evacuation,
    FireRisk,
    Ngps,
}

impl FormulaCategory {
    pub const ALL: [FormulaCategory; 3] = [
        FormulaCategory::Evacuation,
        FormulaCategory::FireRisk,
        FormulaCategory::Ngps,
    ];

    pub fn display_name(&self) -> &'static str {
        match self {
            FormulaCategory::Evacuation => "Evacuation Time",
            FormulaCategory::FireRisk => "Fire Risk",
            FormulaCategory::Ngps => "NGPS Determination",
        }
    }
}

/// Definition of a variable used in a formula.
#[derive(Debug, Clone)]
pub struct Variable {
    pub symbol: &'static str,
    pub description: &'static str,
    pub units: &'static str,
}

impl Variable {
    pub const fn new(symbol: &'static str, description: &'static str, units: &'static str) -> Self {
        Self { symbol, description, units }
    }
}

/// Complete metadata for one formula.
#[derive(Debug, Clone)]
pub struct FormulaMetadata {
    pub name: &'static str,
    pub description: &'static str,
    /// Typst math notation for PDF rendering
    pub formula_typst: &'static str,
    /// Plain text for markdown
    pub formula_plain: &'static str,
    pub reference: NormReference,
    pub variables: Vec<Variable>,
    pub assumptions: Vec<&'static str>,
    pub category: FormulaCategory,
    /// Source module where the formula is implemented
    pub source_module: &'static str,
    pub source_function: &'static str,
}

// ============================================================================
// Formula Enum
// ============================================================================

/// All formulas used by the calculators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Formula {
    // Evacuation
    SegmentThroughput,
    EvacuationTime,
    SmokeMultiplier,
    MobilityMultiplier,
    EvacuationStatus,

    // Fire risk
    CategoryBaseRisk,
    WeightedFactor,
    ProtectionCredit,
    TrainingCredit,
    RiskScore,
    RiskBand,

    // NGPS
    NgpsRequirement,
    LargeAreaVehicles,
    FirePost,
    StaffPerShift,
    StaffTotal,
}

const EVACUATION_NORM: NormReference = NormReference::SnRk {
    number: "2.02-01-2019",
    section: "evacuation routes and exits",
};

const RISK_METHOD: NormReference = NormReference::TechnicalRegulation {
    section: "fire-risk assessment methodology",
};

impl Formula {
    pub const ALL: [Formula; 16] = [
        Formula::SegmentThroughput,
        Formula::EvacuationTime,
        Formula::SmokeMultiplier,
        Formula::MobilityMultiplier,
        Formula::EvacuationStatus,
        Formula::CategoryBaseRisk,
        Formula::WeightedFactor,
        Formula::ProtectionCredit,
        Formula::TrainingCredit,
        Formula::RiskScore,
        Formula::RiskBand,
        Formula::NgpsRequirement,
        Formula::LargeAreaVehicles,
        Formula::FirePost,
        Formula::StaffPerShift,
        Formula::StaffTotal,
    ];

    /// Get the full metadata for this formula
    pub fn metadata(&self) -> FormulaMetadata {
        match self {
            Formula::SegmentThroughput => FormulaMetadata {
                name: "Segment Throughput",
                description: "Flow capacity of a route element from its clear width",
                formula_typst: r#"$Q_i = b_i dot q_i$"#,
                formula_plain: "Q_i = b_i * q_i",
                reference: EVACUATION_NORM,
                variables: vec![
                    Variable::new("Q_i", "Segment throughput", "people/min"),
                    Variable::new("b_i", "Clear width", "m"),
                    Variable::new("q_i", "Unit throughput: door 60, corridor 80, stair 50, exit 90", "people/min/m"),
                ],
                assumptions: vec![
                    "Stair rated with the corridor constant when there are no flights (configurable)",
                    "Bottleneck ties resolved in route order: door, corridor, stair, exit",
                ],
                category: FormulaCategory::Evacuation,
                source_module: "calculations/evacuation.rs",
                source_function: "segment_throughputs",
            },

            Formula::EvacuationTime => FormulaMetadata {
                name: "Evacuation Time",
                description: "Queue through the bottleneck plus walking time, scaled by smoke and mobility",
                formula_typst: r#"$t = (N / Q_min + L_c / v_h + n_f l_f / v_s) dot k_s dot k_m$"#,
                formula_plain: "t = (N / Q_min + L_c / 100 + n_f * 3.5 / 60) * k_s * k_m",
                reference: EVACUATION_NORM,
                variables: vec![
                    Variable::new("N", "People using the route", "people"),
                    Variable::new("Q_min", "Bottleneck throughput", "people/min"),
                    Variable::new("L_c", "Corridor length", "m"),
                    Variable::new("v_h", "Horizontal speed, 100", "m/min"),
                    Variable::new("n_f", "Stair flights", "-"),
                    Variable::new("l_f", "Path length per flight, 3.5", "m"),
                    Variable::new("v_s", "Stair speed, 60", "m/min"),
                ],
                assumptions: vec!["Single escape route", "Flow is steady at the bottleneck"],
                category: FormulaCategory::Evacuation,
                source_module: "calculations/evacuation.rs",
                source_function: "calculate_with",
            },

            Formula::SmokeMultiplier => FormulaMetadata {
                name: "Smoke Multiplier",
                description: "Slowdown from reduced visibility",
                formula_typst: r#"$k_s = 1.0$ (clear), $1.3$ (light), $1.8$ (heavy)"#,
                formula_plain: "k_s = 1.0 (clear), 1.3 (light), 1.8 (heavy)",
                reference: NormReference::Methodology,
                variables: vec![Variable::new("k_s", "Smoke multiplier", "-")],
                assumptions: vec![],
                category: FormulaCategory::Evacuation,
                source_module: "calculations/evacuation.rs",
                source_function: "SmokeDensity::multiplier",
            },

            Formula::MobilityMultiplier => FormulaMetadata {
                name: "Mobility Multiplier",
                description: "Slowdown from occupants needing assistance",
                formula_typst: r#"$k_m = 1 + N_m / N dot 0.5$"#,
                formula_plain: "k_m = 1 + (N_m / N) * 0.5",
                reference: NormReference::Methodology,
                variables: vec![
                    Variable::new("N_m", "Occupants with limited mobility", "people"),
                    Variable::new("N", "People using the route", "people"),
                ],
                assumptions: vec!["N_m <= N"],
                category: FormulaCategory::Evacuation,
                source_module: "calculations/evacuation.rs",
                source_function: "calculate_with",
            },

            Formula::EvacuationStatus => FormulaMetadata {
                name: "Evacuation Status",
                description: "Comparison with the permissible time for the occupancy",
                formula_typst: r#"$"safe" <=> t <= 0.8 t_"req"$, $"warning" <=> t <= t_"req"$"#,
                formula_plain: "safe if t <= 0.8 t_req; warning if t <= t_req; else danger",
                reference: EVACUATION_NORM,
                variables: vec![Variable::new(
                    "t_req",
                    "Permissible time: retail 3, educational 4, office 6, industrial 6, residential 8, hotel 8, warehouse 8, healthcare 10",
                    "min",
                )],
                assumptions: vec![],
                category: FormulaCategory::Evacuation,
                source_module: "calculations/evacuation.rs",
                source_function: "EvacuationStatus::classify",
            },

            Formula::CategoryBaseRisk => FormulaMetadata {
                name: "Category Base Risk",
                description: "Starting score from the hazard category, weighted by building purpose",
                formula_typst: r#"$R_0 = r_"cat" dot k_"type"$"#,
                formula_plain: "R_0 = r_cat * k_type",
                reference: RISK_METHOD,
                variables: vec![
                    Variable::new("r_cat", "A 90, B 75, V 60, G 40, D 25", "points"),
                    Variable::new(
                        "k_type",
                        "production 1.0, warehouse 0.9, public 0.8, administrative 0.7, residential 0.6",
                        "-",
                    ),
                ],
                assumptions: vec![],
                category: FormulaCategory::FireRisk,
                source_module: "calculations/fire_risk.rs",
                source_function: "base_category_risk",
            },

            Formula::WeightedFactor => FormulaMetadata {
                name: "Weighted Risk Factor",
                description: "Capped contribution of one aggravating factor",
                formula_typst: r#"$c_j = w_j dot min(x_j, x_j^max)$"#,
                formula_plain: "c_j = w_j * min(x_j, max_j)",
                reference: RISK_METHOD,
                variables: vec![
                    Variable::new("x_j", "area 10 log10(S); density 2 n/100m2; storeys 4(f-1); load P/20; hazmat 30; maintenance 5(3-m)", "points"),
                    Variable::new("w_j", "0.2; 0.25; 0.15; 0.15; 0.3; 1.0", "-"),
                    Variable::new("max_j", "50; 40; 40; 40; 30; 10", "points"),
                ],
                assumptions: vec!["Maintenance penalty only below grade 3"],
                category: FormulaCategory::FireRisk,
                source_module: "calculations/fire_risk.rs",
                source_function: "score_factors",
            },

            Formula::ProtectionCredit => FormulaMetadata {
                name: "Protection Credit",
                description: "Reduction for each installed active protection system",
                formula_typst: r#"$C_p = sum_k p_k$"#,
                formula_plain: "C_p = sum of p_k over installed systems",
                reference: NormReference::SpRk {
                    number: "2.02-104-2014",
                    section: "automatic fire alarm and suppression systems",
                },
                variables: vec![Variable::new(
                    "p_k",
                    "detection 15, suppression 25, smoke removal 10, barriers 12, extinguishers 5",
                    "points",
                )],
                assumptions: vec!["Systems are assumed operable"],
                category: FormulaCategory::FireRisk,
                source_module: "calculations/fire_risk.rs",
                source_function: "ProtectiveSystem::credit",
            },

            Formula::TrainingCredit => FormulaMetadata {
                name: "Training Credit",
                description: "Reduction for staff training above the baseline grade",
                formula_typst: r#"$C_t = 3 dot max(0, g - 3)$"#,
                formula_plain: "C_t = 3 * max(0, g - 3)",
                reference: RISK_METHOD,
                variables: vec![Variable::new("g", "Training grade 1..5", "-")],
                assumptions: vec![],
                category: FormulaCategory::FireRisk,
                source_module: "calculations/fire_risk.rs",
                source_function: "score_factors",
            },

            Formula::RiskScore => FormulaMetadata {
                name: "Total Risk",
                description: "Sum of base, factors and credits, clamped to the 0..100 scale",
                formula_typst: r#"$R = "clamp"(R_0 + sum c_j - C_p - C_t, 0, 100)$"#,
                formula_plain: "R = clamp(R_0 + sum c_j - C_p - C_t, 0, 100)",
                reference: RISK_METHOD,
                variables: vec![Variable::new("R", "Total risk", "points")],
                assumptions: vec![],
                category: FormulaCategory::FireRisk,
                source_module: "calculations/fire_risk.rs",
                source_function: "calculate",
            },

            Formula::RiskBand => FormulaMetadata {
                name: "Risk Band",
                description: "Qualitative band of the total risk",
                formula_typst: r#"$R >= 80$ critical, $R >= 65$ high, $R >= 45$ medium, $R >= 25$ low"#,
                formula_plain: "critical >= 80, high >= 65, medium >= 45, low >= 25, else very low",
                reference: RISK_METHOD,
                variables: vec![],
                assumptions: vec![],
                category: FormulaCategory::FireRisk,
                source_module: "calculations/fire_risk.rs",
                source_function: "RiskLevel::from_score",
            },

            Formula::NgpsRequirement => FormulaMetadata {
                name: "Mandatory NGPS",
                description: "Industries that must keep a non-state fire-fighting unit, with their technical base",
                formula_typst: r#"$v = v_"base"("industry")$"#,
                formula_plain: "v = tech base: oil-gas 2, chemical 2, airport 2, nuclear 2, energy 1, mining 1, fuel-depot 1, metro 1",
                reference: NormReference::CivilProtectionLaw {
                    article: "non-state fire-fighting service",
                },
                variables: vec![Variable::new("v", "Fire engines", "-")],
                assumptions: vec![],
                category: FormulaCategory::Ngps,
                source_module: "calculations/ngps.rs",
                source_function: "IndustryType::tech_base",
            },

            Formula::LargeAreaVehicles => FormulaMetadata {
                name: "Large-Area Apparatus",
                description: "Minimum vehicle count for large sites",
                formula_typst: r#"$v = max(v, v_"min")$ if $S > S_"thr"$"#,
                formula_plain: "v = max(v, v_min) if S > S_thr",
                reference: NormReference::Methodology,
                variables: vec![
                    Variable::new("S", "Site area", "m2"),
                    Variable::new("S_thr", "Large-area threshold (project setting, default 10000)", "m2"),
                    Variable::new("v_min", "Minimum fire engines above the threshold (default 2)", "-"),
                ],
                assumptions: vec!["Recommendation, not a norm; threshold and minimum are project settings"],
                category: FormulaCategory::Ngps,
                source_module: "calculations/ngps.rs",
                source_function: "calculate_with",
            },

            Formula::FirePost => FormulaMetadata {
                name: "Fire Post",
                description: "Post advised for hazardous sites outside the state service radius",
                formula_typst: r#"$"post" <=> "cat" in \{A, B, V\} " and " d > 3$"#,
                formula_plain: "post if category in {A, B, V} and d > 3 km",
                reference: NormReference::TechnicalRegulation {
                    section: "fire station service radius",
                },
                variables: vec![Variable::new("d", "Distance to nearest state fire station", "km")],
                assumptions: vec!["Only for industries without a mandatory NGPS"],
                category: FormulaCategory::Ngps,
                source_module: "calculations/ngps.rs",
                source_function: "NgpsInput::needs_post",
            },

            Formula::StaffPerShift => FormulaMetadata {
                name: "Staff per Shift",
                description: "Crew on duty in one shift",
                formula_typst: r#"$n_s = 2$ ($v = 0$), $4$ ($v = 1$), $6 + 2(v - 2)$ ($v >= 2$)"#,
                formula_plain: "n_s = 2 (v = 0), 4 (v = 1), 6 + 2(v - 2) (v >= 2)",
                reference: NormReference::Methodology,
                variables: vec![Variable::new("v", "Fire engines", "-")],
                assumptions: vec![],
                category: FormulaCategory::Ngps,
                source_module: "calculations/ngps.rs",
                source_function: "staff_per_shift",
            },

            Formula::StaffTotal => FormulaMetadata {
                name: "Total Staff",
                description: "Headcount for a shift roster including unit management",
                formula_typst: r#"$n = n_s dot s + 2 [v > 0]$"#,
                formula_plain: "n = n_s * s + (2 if v > 0)",
                reference: NormReference::Methodology,
                variables: vec![Variable::new("s", "Shifts in the roster (3 or 4)", "-")],
                assumptions: vec![],
                category: FormulaCategory::Ngps,
                source_module: "calculations/ngps.rs",
                source_function: "staff_total",
            },
        }
    }

    /// Formulas in a category, in registry order
    pub fn in_category(category: FormulaCategory) -> Vec<Formula> {
        Formula::ALL
            .iter()
            .copied()
            .filter(|f| f.metadata().category == category)
            .collect()
    }
}

/// Render the full registry as markdown (`FORMULAS.md`).
pub fn generate_formulas_markdown() -> String {
    let mut output = String::with_capacity(16_000);

    output.push_str(
        r#"# Ortcalc Formulas Reference

> **Auto-generated from source code. Do not edit manually.**
>
> Regenerate with: `cargo run --bin gen-formulas`

Every formula used by the evacuation, fire-risk and NGPS calculators, with
its normative source and the place it is implemented.

---

"#,
    );

    for category in FormulaCategory::ALL {
        output.push_str(&format!("## {}\n\n", category.display_name()));

        for formula in Formula::in_category(category) {
            let meta = formula.metadata();
            output.push_str(&format!("### {}\n\n{}\n\n", meta.name, meta.description));
            output.push_str(&format!("**Formula:** `{}`\n\n", meta.formula_plain));

            if !meta.variables.is_empty() {
                output.push_str("**Variables:**\n\n| Symbol | Description | Units |\n|--------|-------------|-------|\n");
                for var in &meta.variables {
                    output.push_str(&format!("| {} | {} | {} |\n", var.symbol, var.description, var.units));
                }
                output.push('\n');
            }

            output.push_str(&format!("**Reference:** {}\n\n", meta.reference.citation()));
            output.push_str(&format!(
                "**Source:** [`{}`](src/{})\n\n",
                meta.source_function, meta.source_module
            ));

            if !meta.assumptions.is_empty() {
                output.push_str("**Assumptions:**\n");
                for assumption in &meta.assumptions {
                    output.push_str(&format!("- {}\n", assumption));
                }
                output.push('\n');
            }

            output.push_str("---\n\n");
        }
    }

    output.push_str(&format!("**Total formulas:** {}\n", Formula::ALL.len()));
    output
}
