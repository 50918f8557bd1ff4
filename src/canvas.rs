use serde::{Deserialize, Serialize};

/// Answers collected by the canvas wizard. Never stored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CanvasInput {
    pub product_type: String,
    pub target_customer: String,
    #[serde(default)]
    pub value_propositions: Vec<String>,
    #[serde(default)]
    pub cost_structure: Vec<String>,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingAnchor {
    pub min: f64,
    pub max: f64,
    pub unit: String,
    pub currency: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferencedCase {
    pub id: String,
    pub name: String,
    pub relevance: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanvasRecommendation {
    pub rank: u32,
    pub confidence: f64,
    pub name: String,
    pub reasoning: String,
    pub pricing_anchor: PricingAnchor,
    pub referenced_cases: Vec<ReferencedCase>,
    pub mvp_path: Vec<String>,
    pub validation_checklist: Vec<String>,
    pub risk_warnings: Vec<String>,
}

// --- Rule table ---

const MODEL_KEYWORDS: &[&str] = &["模型", "api", "llm", "model"];
const ENTERPRISE_MARKERS: &[&str] = &["企业", "tob", "enterprise"];
const COMPUTE_HEAVY_MARKERS: &[&str] = &["算力成本高", "compute", "compute_heavy"];

#[derive(Debug, Clone, Copy)]
pub enum Condition {
    /// Product type mentions any keyword. CJK keywords match as substrings,
    /// ASCII keywords only as whole words (case-insensitive).
    ProductTypeContains(&'static [&'static str]),
    /// Target customer equals one of the markers.
    TargetCustomerIs(&'static [&'static str]),
    /// Any selected cost driver equals one of the markers.
    CostStructureIncludes(&'static [&'static str]),
}

impl Condition {
    pub fn holds(&self, input: &CanvasInput) -> bool {
        match self {
            Condition::ProductTypeContains(keywords) => {
                let product = input.product_type.to_lowercase();
                keywords.iter().any(|k| mentions(&product, k))
            }
            Condition::TargetCustomerIs(markers) => {
                let customer = input.target_customer.trim().to_lowercase();
                markers.contains(&customer.as_str())
            }
            Condition::CostStructureIncludes(markers) => input
                .cost_structure
                .iter()
                .any(|c| markers.contains(&c.trim().to_lowercase().as_str())),
        }
    }
}

fn mentions(text: &str, keyword: &str) -> bool {
    if keyword.is_ascii() {
        text.split(|c: char| !c.is_ascii_alphanumeric())
            .any(|word| word == keyword)
    } else {
        text.contains(keyword)
    }
}

pub struct Rule {
    pub condition: Condition,
    pub recommend: fn() -> CanvasRecommendation,
}

/// Evaluated top to bottom; every matching rule contributes.
pub const RULES: &[Rule] = &[
    Rule {
        condition: Condition::ProductTypeContains(MODEL_KEYWORDS),
        recommend: api_usage_with_subscription,
    },
    Rule {
        condition: Condition::TargetCustomerIs(ENTERPRISE_MARKERS),
        recommend: enterprise_deployment,
    },
    Rule {
        condition: Condition::CostStructureIncludes(COMPUTE_HEAVY_MARKERS),
        recommend: prepaid_packages,
    },
];

/// Output follows rule order. Rank and confidence are part of each template
/// and play no part in ordering. No match yields an empty list.
pub fn generate(input: &CanvasInput) -> Vec<CanvasRecommendation> {
    RULES
        .iter()
        .filter(|rule| rule.condition.holds(input))
        .map(|rule| (rule.recommend)())
        .collect()
}

// --- Templates ---

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn case_ref(id: &str, name: &str, relevance: &str) -> ReferencedCase {
    ReferencedCase {
        id: id.to_string(),
        name: name.to_string(),
        relevance: relevance.to_string(),
    }
}

fn api_usage_with_subscription() -> CanvasRecommendation {
    CanvasRecommendation {
        rank: 1,
        confidence: 0.92,
        name: "API Token 计费 + 订阅制".to_string(),
        reasoning: "基于你的产品类型和成本结构，API Token 计费是模型层的行业标准变现方式，可以与订阅制组合提供稳定现金流。".to_string(),
        pricing_anchor: PricingAnchor {
            min: 0.01,
            max: 0.05,
            unit: "per 1K tokens".to_string(),
            currency: "USD".to_string(),
        },
        referenced_cases: vec![
            case_ref("case-001", "OpenAI GPT-4", "高度相关"),
            case_ref("case-002", "Claude", "高度相关"),
        ],
        mvp_path: strings(&[
            "设置免费额度 (1000 tokens/天)",
            "超出后按 $0.02/1K 计费",
            "提供 $29/月 订阅选项包含 100K tokens",
        ]),
        validation_checklist: strings(&["确定 Token 计量方式", "测试支付流程", "监控首月转化率"]),
        risk_warnings: strings(&["算力成本波动可能影响毛利率", "需要精确的 Token 计量系统"]),
    }
}

fn enterprise_deployment() -> CanvasRecommendation {
    CanvasRecommendation {
        rank: 2,
        confidence: 0.85,
        name: "企业版/私有化部署".to_string(),
        reasoning: "面向企业客户，私有化部署可以满足数据安全和合规需求，客单价高。".to_string(),
        pricing_anchor: PricingAnchor {
            min: 10000.0,
            max: 100000.0,
            unit: "per year".to_string(),
            currency: "USD".to_string(),
        },
        referenced_cases: vec![case_ref("case-004", "智谱 GLM", "高度相关")],
        mvp_path: strings(&["推出 SaaS 版本验证需求", "收集企业客户反馈", "推出私有化部署方案"]),
        validation_checklist: strings(&["确认企业客户需求", "评估私有化部署成本", "建立企业销售团队"]),
        risk_warnings: strings(&["销售周期长（3-12个月）", "需要专业销售团队"]),
    }
}

fn prepaid_packages() -> CanvasRecommendation {
    CanvasRecommendation {
        rank: 3,
        confidence: 0.78,
        name: "用量包/预付费".to_string(),
        reasoning: "预付费模式可以提前锁定收入，改善现金流，降低算力成本波动风险。".to_string(),
        pricing_anchor: PricingAnchor {
            min: 5.0,
            max: 10000.0,
            unit: "per package".to_string(),
            currency: "USD".to_string(),
        },
        referenced_cases: vec![case_ref("case-006", "Runway", "中度相关")],
        mvp_path: strings(&["设计多档用量包", "设置有效期策略", "提供购买优惠"]),
        validation_checklist: strings(&["测试用户购买意愿", "优化用量包档位", "监控使用率"]),
        risk_warnings: strings(&["用户购买后长期不使用", "过期争议"]),
    }
}
