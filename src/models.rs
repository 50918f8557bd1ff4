use chrono::{DateTime, NaiveDate, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

use crate::store::Catalog;

// --- Tag enums ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ChainLevel {
    Compute,
    Model,
    Toolchain,
    Application,
    Data,
    Service,
}

impl ChainLevel {
    pub const ALL: [ChainLevel; 6] = [
        ChainLevel::Compute,
        ChainLevel::Model,
        ChainLevel::Toolchain,
        ChainLevel::Application,
        ChainLevel::Data,
        ChainLevel::Service,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ChainLevel::Compute => "算力/云与芯片",
            ChainLevel::Model => "模型",
            ChainLevel::Toolchain => "工具链/中间件",
            ChainLevel::Application => "应用",
            ChainLevel::Data => "数据",
            ChainLevel::Service => "服务/集成",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
pub enum Audience {
    #[serde(rename = "tob", alias = "enterprise")]
    #[value(name = "tob", alias = "enterprise")]
    Enterprise,
    #[serde(rename = "toc", alias = "consumer")]
    #[value(name = "toc", alias = "consumer")]
    Consumer,
    #[serde(rename = "tod", alias = "developer")]
    #[value(name = "tod", alias = "developer")]
    Developer,
    #[serde(other)]
    #[value(skip)]
    Unknown,
}

impl Audience {
    pub fn label(self) -> &'static str {
        match self {
            Audience::Enterprise => "企业 (ToB)",
            Audience::Consumer => "消费者 (ToC)",
            Audience::Developer => "开发者 (ToD)",
            Audience::Unknown => "-",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum BillingUnit {
    Token,
    Seat,
    #[value(name = "gpu_hour", alias = "gpu-hour")]
    GpuHour,
    Project,
    Commission,
    Subscription,
    Usage,
    License,
    Performance,
    Advertising,
    #[serde(other)]
    #[value(skip)]
    Unknown,
}

impl BillingUnit {
    pub fn label(self) -> &'static str {
        match self {
            BillingUnit::Token => "Token",
            BillingUnit::Seat => "座位/用户数",
            BillingUnit::GpuHour => "GPU-hour",
            BillingUnit::Project => "项目制",
            BillingUnit::Commission => "抽佣",
            BillingUnit::Subscription => "订阅",
            BillingUnit::Usage => "用量",
            BillingUnit::License => "授权费",
            BillingUnit::Performance => "效果付费",
            BillingUnit::Advertising => "广告",
            BillingUnit::Unknown => "-",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum CompanyType {
    Public,
    Unicorn,
    Startup,
    Enterprise,
    #[serde(other)]
    #[value(skip)]
    Other,
}

impl CompanyType {
    pub fn label(self) -> &'static str {
        match self {
            CompanyType::Public => "上市公司",
            CompanyType::Unicorn => "独角兽",
            CompanyType::Startup => "初创公司",
            CompanyType::Enterprise => "大型企业",
            CompanyType::Other => "-",
        }
    }
}

/// Ordinal rating shared by gross margin, scalability, data dependency and
/// compute-cost sensitivity. Only gross margin uses the `very_*` ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Level {
    #[value(name = "very_low")]
    VeryLow,
    Low,
    Medium,
    High,
    #[value(name = "very_high")]
    VeryHigh,
}

impl Level {
    pub fn label(self) -> &'static str {
        match self {
            Level::VeryLow => "极低",
            Level::Low => "低",
            Level::Medium => "中",
            Level::High => "高",
            Level::VeryHigh => "极高",
        }
    }
}

// --- Records ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonetizationMethod {
    pub id: String,
    pub slug: String,
    pub name: String,
    pub definition: String,
    pub short_description: String,
    pub chain_level: ChainLevel,
    #[serde(default)]
    pub target_audience: Vec<Audience>,
    #[serde(default)]
    pub billing_unit: Vec<BillingUnit>, // first entry decides the matrix column
    pub price_anchor_min: Option<f64>,
    pub price_anchor_max: Option<f64>,
    #[serde(default)]
    pub price_currency: String,
    #[serde(default)]
    pub price_unit: String,
    pub cost_structure: Option<BTreeMap<String, f64>>, // share of cost, not normalized
    pub gross_margin_level: Level,
    #[serde(default)]
    pub margin_sensitivity: Vec<String>,
    pub scalability_level: Level,
    pub data_dependency_level: Level,
    pub compute_cost_sensitivity: Level,
    #[serde(default)]
    pub sales_model: Vec<String>,
    #[serde(default)]
    pub advantages: Vec<String>,
    #[serde(default)]
    pub disadvantages: Vec<String>,
    #[serde(default)]
    pub applicable_scenarios: Vec<String>,
    #[serde(default)]
    pub common_combinations: Vec<String>,
    #[serde(default)]
    pub risk_points: Vec<String>,
    #[serde(default)]
    pub view_count: u64,
    #[serde(default)]
    pub like_count: u64,
    #[serde(default)]
    pub case_count: u64,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub is_featured: bool,
    #[serde(default)]
    pub updated_at: String,
}

impl MonetizationMethod {
    pub fn price_anchor(&self) -> Option<String> {
        let range = match (self.price_anchor_min, self.price_anchor_max) {
            (Some(min), Some(max)) => format!("{} - {}", min, max),
            (Some(min), None) => format!("{}+", min),
            (None, Some(max)) => format!("up to {}", max),
            (None, None) => return None,
        };
        Some(format!("{} {} {}", range, self.price_currency, self.price_unit).trim_end().to_string())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Case {
    pub id: String,
    pub slug: String,
    pub name: String,
    pub company_name: String,
    pub logo_url: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub short_description: String,
    pub chain_level: ChainLevel,
    #[serde(default)]
    pub chain_subcategory: String,
    pub company_type: CompanyType,
    pub founded_year: Option<i32>,
    #[serde(default)]
    pub headquarters: String,
    #[serde(default)]
    pub employee_count_range: String,
    pub valuation_amount: Option<f64>,
    pub valuation_currency: Option<String>,
    pub valuation_date: Option<String>,
    pub annual_revenue: Option<f64>,
    pub revenue_currency: Option<String>,
    pub revenue_year: Option<i32>,
    #[serde(default)]
    pub user_count: String,
    #[serde(default)]
    pub monetization_methods: Vec<MonetizationBinding>,
    #[serde(default)]
    pub growth_path: Vec<GrowthStage>,
    #[serde(default)]
    pub competitors: Vec<Competitor>,
    #[serde(default)]
    pub view_count: u64,
    #[serde(default)]
    pub like_count: u64,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub is_featured: bool,
    #[serde(default)]
    pub updated_at: String,
}

impl Case {
    /// First binding flagged primary, else the first binding. Several
    /// primaries are tolerated; the earliest one wins.
    pub fn primary_binding(&self) -> Option<&MonetizationBinding> {
        self.monetization_methods
            .iter()
            .find(|b| b.is_primary)
            .or_else(|| self.monetization_methods.first())
    }

    pub fn valuation(&self) -> Option<Money> {
        self.valuation_amount.map(|amount| Money {
            amount,
            currency: self.valuation_currency.clone().unwrap_or_default(),
        })
    }

    pub fn revenue(&self) -> Option<Money> {
        self.annual_revenue.map(|amount| Money {
            amount,
            currency: self.revenue_currency.clone().unwrap_or_default(),
        })
    }

    pub fn references_method(&self, method_id: &str) -> bool {
        self.monetization_methods.iter().any(|b| b.method_id == method_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonetizationBinding {
    pub method_id: String,
    pub name: String, // snapshot of the method name at authoring time
    #[serde(default)]
    pub is_primary: bool,
    #[serde(default)]
    pub pricing_details: PricingDetails,
    #[serde(default)]
    pub evidence_links: Vec<EvidenceLink>,
}

/// Free-form pricing attributes with two reserved keys, `currency` and `unit`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PricingDetails(serde_json::Map<String, Value>);

impl PricingDetails {
    const RESERVED: [&'static str; 2] = ["currency", "unit"];

    pub fn currency(&self) -> Option<&str> {
        self.0.get("currency").and_then(Value::as_str)
    }

    pub fn unit(&self) -> Option<&str> {
        self.0.get("unit").and_then(Value::as_str)
    }

    /// Non-reserved entries in source order, values rendered as text.
    pub fn entries(&self) -> Vec<(&str, String)> {
        self.0
            .iter()
            .filter(|(key, _)| !Self::RESERVED.contains(&key.as_str()))
            .map(|(key, value)| {
                let text = match value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (key.as_str(), text)
            })
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvidenceLink {
    pub title: String,
    pub url: String,
    #[serde(rename = "type", default)]
    pub kind: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrowthStage {
    pub stage: String,
    #[serde(default)]
    pub period: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub monetization: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Competitor {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub comparison: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Money {
    pub amount: f64,
    pub currency: String,
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = if self.currency == "USD" { "$" } else { "¥" };
        if self.amount >= 100_000_000.0 {
            write!(f, "{}{:.1}亿", symbol, self.amount / 100_000_000.0)
        } else if self.amount >= 10_000.0 {
            write!(f, "{}{:.0}万", symbol, self.amount / 10_000.0)
        } else {
            write!(f, "{}{}", symbol, self.amount)
        }
    }
}

// --- Shared record view ---

/// What the query layer needs from either collection.
pub trait Record: Sized {
    fn id(&self) -> &str;
    fn slug(&self) -> &str;
    fn name(&self) -> &str;
    fn view_count(&self) -> u64;
    fn updated_at(&self) -> &str;
    fn is_featured(&self) -> bool;

    /// The collection this record type lives in.
    fn records(catalog: &Catalog) -> &[Self];

    fn updated_ts(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(self.updated_at())
    }
}

impl Record for MonetizationMethod {
    fn id(&self) -> &str {
        &self.id
    }
    fn slug(&self) -> &str {
        &self.slug
    }
    fn name(&self) -> &str {
        &self.name
    }
    fn view_count(&self) -> u64 {
        self.view_count
    }
    fn updated_at(&self) -> &str {
        &self.updated_at
    }
    fn is_featured(&self) -> bool {
        self.is_featured
    }
    fn records(catalog: &Catalog) -> &[Self] {
        catalog.methods()
    }
}

impl Record for Case {
    fn id(&self) -> &str {
        &self.id
    }
    fn slug(&self) -> &str {
        &self.slug
    }
    fn name(&self) -> &str {
        &self.name
    }
    fn view_count(&self) -> u64 {
        self.view_count
    }
    fn updated_at(&self) -> &str {
        &self.updated_at
    }
    fn is_featured(&self) -> bool {
        self.is_featured
    }
    fn records(catalog: &Catalog) -> &[Self] {
        catalog.cases()
    }
}

/// Accepts RFC 3339 timestamps or bare `YYYY-MM-DD` dates.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}
