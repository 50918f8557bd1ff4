mod canvas;
mod matrix;
mod models;
mod query;
mod source;
mod store;
mod tui;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use canvas::{CanvasInput, CanvasRecommendation};
use matrix::{Category, Matrix, MatrixFilter};
use models::{Audience, BillingUnit, Case, ChainLevel, CompanyType, Level, MonetizationMethod};
use query::{sort_records, CaseFilter, MethodFilter, SortKey, Stats};
use source::SourceConfig;
use store::{Catalog, LoadState};

#[derive(Parser)]
#[command(name = "atlas")]
#[command(about = "Explore how AI products make money - methods, case studies, and a pricing canvas")]
struct Cli {
    /// Monetization methods document (file path or http(s) URL)
    #[arg(long, global = true, env = "ATLAS_METHODS")]
    methods: Option<String>,

    /// Case studies document (file path or http(s) URL)
    #[arg(long, global = true, env = "ATLAS_CASES")]
    cases: Option<String>,

    /// Directory holding monetization-methods.json and cases.json
    #[arg(long, global = true, env = "ATLAS_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Browse monetization methods
    Methods {
        #[command(subcommand)]
        command: MethodCommands,
    },

    /// Browse company case studies
    Cases {
        #[command(subcommand)]
        command: CaseCommands,
    },

    /// Case counts by chain level and billing category
    Matrix {
        /// Only count methods aimed at these audiences
        #[arg(short, long = "audience", value_enum, value_delimiter = ',')]
        audiences: Vec<Audience>,

        /// Only count methods with these scalability levels
        #[arg(short, long, value_enum, value_delimiter = ',')]
        scalability: Vec<Level>,

        /// Only count methods with these data-dependency levels
        #[arg(short, long, value_enum, value_delimiter = ',')]
        data_dependency: Vec<Level>,

        /// List the cases behind each non-empty cell
        #[arg(long)]
        show_cases: bool,

        #[arg(long)]
        json: bool,
    },

    /// Suggest monetization strategies for a product
    Canvas {
        /// Product type, e.g. "大语言模型" or "llm"
        #[arg(short, long)]
        product_type: String,

        /// Target customer (tob, toc, tod, ...)
        #[arg(short = 'c', long)]
        customer: String,

        /// Value propositions (repeatable)
        #[arg(long = "value", value_delimiter = ',')]
        values: Vec<String>,

        /// Dominant cost drivers (repeatable), e.g. compute_heavy
        #[arg(long = "cost", value_delimiter = ',')]
        costs: Vec<String>,

        /// Free-text description of the product
        #[arg(short, long)]
        description: Option<String>,

        #[arg(long)]
        json: bool,
    },

    /// Catalog totals
    Stats {
        #[arg(long)]
        json: bool,
    },

    /// Interactive browser (tab switches between methods and cases)
    Browse {
        /// Filter by chain level
        #[arg(long, value_enum)]
        chain: Option<ChainLevel>,

        /// Free-text search
        #[arg(short, long)]
        query: Option<String>,

        /// Sort order
        #[arg(short, long, value_enum, default_value_t = SortKey::Popular)]
        sort: SortKey,
    },
}

#[derive(Subcommand)]
enum MethodCommands {
    /// List methods
    List {
        /// Filter by chain level
        #[arg(long, value_enum)]
        chain: Option<ChainLevel>,

        /// Filter by target audience (any match)
        #[arg(short, long = "audience", value_enum, value_delimiter = ',')]
        audiences: Vec<Audience>,

        /// Filter by billing unit (any match)
        #[arg(short, long = "unit", value_enum, value_delimiter = ',')]
        units: Vec<BillingUnit>,

        /// Search name, summary and definition
        #[arg(short, long)]
        query: Option<String>,

        /// Sort order
        #[arg(short, long, value_enum, default_value_t = SortKey::Popular)]
        sort: SortKey,

        /// Only featured methods
        #[arg(long)]
        featured: bool,

        #[arg(long)]
        json: bool,
    },

    /// Show method details
    Show {
        /// Method ID or slug
        id: String,

        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum CaseCommands {
    /// List cases
    List {
        /// Filter by chain level
        #[arg(long, value_enum)]
        chain: Option<ChainLevel>,

        /// Filter by company type (any match)
        #[arg(short = 't', long = "type", value_enum, value_delimiter = ',')]
        types: Vec<CompanyType>,

        /// Search name, company and summary
        #[arg(short, long)]
        query: Option<String>,

        /// Sort order
        #[arg(short, long, value_enum, default_value_t = SortKey::Popular)]
        sort: SortKey,

        /// Only featured cases
        #[arg(long)]
        featured: bool,

        #[arg(long)]
        json: bool,
    },

    /// Show case details
    Show {
        /// Case ID or slug
        id: String,

        #[arg(long)]
        json: bool,
    },

    /// Compare two or three cases side by side
    Compare {
        /// Case IDs or slugs
        #[arg(required = true, num_args = 2..=3)]
        ids: Vec<String>,
    },
}

fn init_logging(verbose: bool) {
    let default = if verbose { "atlas=debug" } else { "atlas=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn open_catalog(cli: &Cli) -> Catalog {
    let config = SourceConfig::resolve(
        cli.data_dir.as_deref(),
        cli.methods.as_deref(),
        cli.cases.as_deref(),
    );
    debug!(methods = %config.methods, cases = %config.cases, "catalog sources");
    let mut catalog = Catalog::new();
    catalog.init(&config).await;
    if catalog.state() == LoadState::Failed {
        eprintln!("Catalog data unavailable; showing an empty catalog.");
    }
    catalog
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let out = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", out);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    // The canvas works from its own rule table and never reads the catalog.
    let catalog = if matches!(cli.command, Commands::Canvas { .. }) {
        Catalog::new()
    } else {
        open_catalog(&cli).await
    };

    match cli.command {
        Commands::Methods { command } => match command {
            MethodCommands::List {
                chain,
                audiences,
                units,
                query,
                sort,
                featured,
                json,
            } => {
                let filter = MethodFilter {
                    chain_level: chain,
                    audiences,
                    billing_units: units,
                    query,
                };
                let mut methods = if featured {
                    filter.apply(catalog.featured::<MonetizationMethod>())
                } else {
                    catalog.filter_methods(&filter)
                };
                sort_records(&mut methods, sort);
                if json {
                    return print_json(&methods);
                }
                print_method_list(&methods);
            }

            MethodCommands::Show { id, json } => match catalog.method(&id) {
                Some(method) if json => print_json(method)?,
                Some(method) => print_method(&catalog, method),
                None => println!("Method '{}' not found.", id),
            },
        },

        Commands::Cases { command } => match command {
            CaseCommands::List {
                chain,
                types,
                query,
                sort,
                featured,
                json,
            } => {
                let filter = CaseFilter {
                    chain_level: chain,
                    company_types: types,
                    query,
                };
                let mut cases = if featured {
                    filter.apply(catalog.featured::<Case>())
                } else {
                    catalog.filter_cases(&filter)
                };
                sort_records(&mut cases, sort);
                if json {
                    return print_json(&cases);
                }
                print_case_list(&cases);
            }

            CaseCommands::Show { id, json } => match catalog.case(&id) {
                Some(case) if json => print_json(case)?,
                Some(case) => print_case(&catalog, case),
                None => println!("Case '{}' not found.", id),
            },

            CaseCommands::Compare { ids } => {
                let keys: Vec<&str> = ids.iter().map(String::as_str).collect();
                let cases = catalog.compare_cases(&keys)?;
                print_compare(&catalog, &cases);
            }
        },

        Commands::Matrix {
            audiences,
            scalability,
            data_dependency,
            show_cases,
            json,
        } => {
            let filter = MatrixFilter {
                audiences,
                scalability,
                data_dependency,
            };
            let matrix = catalog.matrix_counts(&filter);
            if json {
                return print_json(&matrix);
            }
            print_matrix(&catalog, &matrix, show_cases);
        }

        Commands::Stats { json } => {
            let stats = catalog.stats();
            if json {
                return print_json(&stats);
            }
            print_stats(&stats);
        }

        Commands::Browse { chain, query, sort } => {
            let mut methods = catalog.filter_methods(&MethodFilter {
                chain_level: chain,
                query: query.clone(),
                ..Default::default()
            });
            let mut cases = catalog.filter_cases(&CaseFilter {
                chain_level: chain,
                query,
                ..Default::default()
            });
            sort_records(&mut methods, sort);
            sort_records(&mut cases, sort);
            tui::run_browse(&catalog, methods, cases)?;
        }

        Commands::Canvas {
            product_type,
            customer,
            values,
            costs,
            description,
            json,
        } => {
            let input = CanvasInput {
                product_type,
                target_customer: customer,
                value_propositions: values,
                cost_structure: costs,
                description: description.unwrap_or_default(),
            };
            let recommendations = canvas::generate(&input);
            if json {
                return print_json(&recommendations);
            }
            print_canvas(&recommendations);
        }
    }

    Ok(())
}

// --- Output ---

fn print_method_list(methods: &[&MonetizationMethod]) {
    if methods.is_empty() {
        println!("No methods found.");
        return;
    }
    println!(
        "{:<12} {:<24} {:<14} {:<22} {:>8}",
        "ID", "NAME", "LEVEL", "BILLING", "VIEWS"
    );
    println!("{}", "-".repeat(84));
    for method in methods {
        let billing: Vec<&str> = method.billing_unit.iter().map(|u| u.label()).collect();
        println!(
            "{:<12} {:<24} {:<14} {:<22} {:>8}",
            truncate(&method.id, 12),
            truncate(&method.name, 22),
            method.chain_level.label(),
            truncate(&billing.join(","), 20),
            method.view_count
        );
    }
}

fn print_method(catalog: &Catalog, method: &MonetizationMethod) {
    println!("{} ({})", method.name, method.id);
    println!("Slug: {}", method.slug);
    println!("Chain level: {}", method.chain_level.label());
    let audiences: Vec<&str> = method.target_audience.iter().map(|a| a.label()).collect();
    println!("Audience: {}", audiences.join(", "));
    let units: Vec<&str> = method.billing_unit.iter().map(|u| u.label()).collect();
    println!("Billing: {}", units.join(", "));
    if let Some(anchor) = method.price_anchor() {
        println!("Price anchor: {}", anchor);
    }
    println!(
        "Margin: {}  Scalability: {}  Data dependency: {}  Compute sensitivity: {}",
        method.gross_margin_level.label(),
        method.scalability_level.label(),
        method.data_dependency_level.label(),
        method.compute_cost_sensitivity.label()
    );
    if let Some(costs) = &method.cost_structure {
        let parts: Vec<String> = costs
            .iter()
            .map(|(k, v)| format!("{} {:.0}%", k, v * 100.0))
            .collect();
        println!("Cost structure: {}", parts.join(", "));
    }
    println!("Updated: {}", method.updated_at);

    println!("\n{}", textwrap::fill(&method.definition, 78));

    print_section("Advantages", &method.advantages);
    print_section("Disadvantages", &method.disadvantages);
    print_section("Scenarios", &method.applicable_scenarios);
    print_section("Risks", &method.risk_points);

    if !method.common_combinations.is_empty() {
        println!("\nOften combined with:");
        for other in &method.common_combinations {
            let name = catalog.method(other).map(|m| m.name.as_str()).unwrap_or("-");
            println!("  {} ({})", name, other);
        }
    }

    let related = catalog.cases_by_method(&method.id);
    if related.is_empty() {
        println!("\nNo cases use this method yet.");
    } else {
        println!("\nCases ({}):", related.len());
        for case in related {
            println!("  {} - {} ({})", case.id, case.name, case.company_name);
        }
    }
}

fn print_case_list(cases: &[&Case]) {
    if cases.is_empty() {
        println!("No cases found.");
        return;
    }
    println!(
        "{:<10} {:<22} {:<16} {:<14} {:<10} {:>8}",
        "ID", "NAME", "COMPANY", "LEVEL", "TYPE", "VIEWS"
    );
    println!("{}", "-".repeat(84));
    for case in cases {
        println!(
            "{:<10} {:<22} {:<16} {:<14} {:<10} {:>8}",
            truncate(&case.id, 10),
            truncate(&case.name, 20),
            truncate(&case.company_name, 14),
            case.chain_level.label(),
            case.company_type.label(),
            case.view_count
        );
    }
}

fn print_case(catalog: &Catalog, case: &Case) {
    println!("{} ({})", case.name, case.id);
    println!("Company: {} [{}]", case.company_name, case.company_type.label());
    println!(
        "Chain level: {} / {}",
        case.chain_level.label(),
        or_dash(&case.chain_subcategory)
    );
    if let Some(year) = case.founded_year {
        println!("Founded: {}", year);
    }
    println!("HQ: {}", or_dash(&case.headquarters));
    println!("Employees: {}", or_dash(&case.employee_count_range));
    println!("Users: {}", or_dash(&case.user_count));
    match case.valuation() {
        Some(v) => println!(
            "Valuation: {} ({})",
            v,
            case.valuation_date.as_deref().unwrap_or("-")
        ),
        None => println!("Valuation: -"),
    }
    match case.revenue() {
        Some(r) => println!(
            "Revenue: {} ({})",
            r,
            case.revenue_year.map(|y| y.to_string()).unwrap_or_else(|| "-".to_string())
        ),
        None => println!("Revenue: -"),
    }

    if !case.description.is_empty() {
        println!("\n{}", textwrap::fill(&case.description, 78));
    }

    println!("\nMonetization:");
    for binding in &case.monetization_methods {
        let method_name = catalog
            .method(&binding.method_id)
            .map(|m| m.name.as_str())
            .unwrap_or("-");
        let primary = if binding.is_primary { " [primary]" } else { "" };
        println!("  {} ({}){}", method_name, binding.method_id, primary);
        let pricing = &binding.pricing_details;
        for (key, value) in pricing.entries() {
            println!("      {}: {}", key, value);
        }
        if pricing.currency().is_some() || pricing.unit().is_some() {
            println!(
                "      ({} {})",
                pricing.currency().unwrap_or("-"),
                pricing.unit().unwrap_or("-")
            );
        }
        for link in &binding.evidence_links {
            println!("      [{}] {} <{}>", link.kind, link.title, link.url);
        }
    }

    if !case.growth_path.is_empty() {
        println!("\nGrowth path:");
        for (i, stage) in case.growth_path.iter().enumerate() {
            let method = catalog
                .method(&stage.monetization)
                .map(|m| m.name.as_str())
                .unwrap_or("-");
            println!(
                "  {}. {} [{}] {} -> {}",
                i + 1,
                stage.stage,
                stage.period,
                stage.description,
                method
            );
        }
    }

    if !case.competitors.is_empty() {
        println!("\nCompetitors:");
        for competitor in &case.competitors {
            println!(
                "  {} ({}): {}",
                competitor.name, competitor.id, competitor.comparison
            );
        }
    }
}

fn print_compare(catalog: &Catalog, cases: &[&Case]) {
    let rows: Vec<(&str, Vec<String>)> = vec![
        ("Name", cases.iter().map(|c| c.name.clone()).collect()),
        ("Company", cases.iter().map(|c| c.company_name.clone()).collect()),
        ("Level", cases.iter().map(|c| c.chain_level.label().to_string()).collect()),
        ("Type", cases.iter().map(|c| c.company_type.label().to_string()).collect()),
        (
            "Founded",
            cases
                .iter()
                .map(|c| c.founded_year.map(|y| y.to_string()).unwrap_or_else(|| "-".to_string()))
                .collect(),
        ),
        ("HQ", cases.iter().map(|c| or_dash(&c.headquarters).to_string()).collect()),
        ("Employees", cases.iter().map(|c| or_dash(&c.employee_count_range).to_string()).collect()),
        (
            "Valuation",
            cases
                .iter()
                .map(|c| c.valuation().map(|v| v.to_string()).unwrap_or_else(|| "-".to_string()))
                .collect(),
        ),
        (
            "Revenue",
            cases
                .iter()
                .map(|c| c.revenue().map(|r| r.to_string()).unwrap_or_else(|| "-".to_string()))
                .collect(),
        ),
        ("Users", cases.iter().map(|c| or_dash(&c.user_count).to_string()).collect()),
        (
            "Primary",
            cases
                .iter()
                .map(|c| {
                    c.primary_binding()
                        .and_then(|b| catalog.method(&b.method_id).map(|m| m.name.clone()))
                        .unwrap_or_else(|| "-".to_string())
                })
                .collect(),
        ),
        (
            "Methods",
            cases.iter().map(|c| c.monetization_methods.len().to_string()).collect(),
        ),
    ];

    for (label, values) in rows {
        let cells: Vec<String> = values.iter().map(|v| format!("{:<22}", truncate(v, 20))).collect();
        println!("{:<10} {}", label, cells.join(" "));
    }
}

fn print_matrix(catalog: &Catalog, matrix: &Matrix, with_cases: bool) {
    print!("{:<16}", "");
    for category in Category::ALL {
        print!("{:>10}", category.label());
    }
    println!();
    println!("{}", "-".repeat(16 + 10 * Category::ALL.len()));
    for level in ChainLevel::ALL {
        print!("{:<16}", level.label());
        for category in Category::ALL {
            print!("{:>10}", matrix.count(level, category));
        }
        println!();
    }
    println!("\nTotal: {}", matrix.total());

    if with_cases {
        for level in ChainLevel::ALL {
            for category in Category::ALL {
                let cell = matrix.cell(level, category);
                if cell.cases.is_empty() {
                    continue;
                }
                let names: Vec<&str> = cell
                    .cases
                    .iter()
                    .map(|id| catalog.case(id).map(|c| c.name.as_str()).unwrap_or("-"))
                    .collect();
                println!("{} / {}: {}", level.label(), category.label(), names.join(", "));
            }
        }
    }
}

fn print_canvas(recommendations: &[CanvasRecommendation]) {
    if recommendations.is_empty() {
        println!("No recommendation matched these answers. Try a different product type, customer, or cost driver.");
        return;
    }
    for rec in recommendations {
        println!(
            "#{} {} (confidence {:.0}%)",
            rec.rank,
            rec.name,
            rec.confidence * 100.0
        );
        println!("{}", textwrap::fill(&rec.reasoning, 78));
        let anchor = &rec.pricing_anchor;
        println!(
            "Pricing anchor: {} - {} {} {}",
            anchor.min, anchor.max, anchor.currency, anchor.unit
        );
        let refs: Vec<String> = rec
            .referenced_cases
            .iter()
            .map(|c| format!("{} ({})", c.name, c.relevance))
            .collect();
        println!("Reference cases: {}", refs.join(", "));
        println!("MVP path:");
        for (i, step) in rec.mvp_path.iter().enumerate() {
            println!("  {}. {}", i + 1, step);
        }
        print_section("Validate", &rec.validation_checklist);
        print_section("Risks", &rec.risk_warnings);
        println!();
    }
}

fn print_stats(stats: &Stats) {
    println!("Methods:   {}", stats.methods);
    println!("Cases:     {}", stats.cases);
    println!("Companies: {}", stats.companies);
}

fn print_section(title: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    println!("{}:", title);
    for item in items {
        println!("  - {}", item);
    }
}

fn or_dash(s: &str) -> &str {
    if s.trim().is_empty() { "-" } else { s }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let head: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}
