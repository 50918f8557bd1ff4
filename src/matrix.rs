use serde::Serialize;
use std::collections::BTreeMap;

use crate::models::{Audience, BillingUnit, ChainLevel, Level, MonetizationMethod};
use crate::store::Catalog;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    ApiBilling,
    Subscription,
    Commission,
    Project,
    Advertising,
    Performance,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::ApiBilling,
        Category::Subscription,
        Category::Commission,
        Category::Project,
        Category::Advertising,
        Category::Performance,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Category::ApiBilling => "API计费",
            Category::Subscription => "订阅制",
            Category::Commission => "抽佣",
            Category::Project => "项目制",
            Category::Advertising => "广告",
            Category::Performance => "效果付费",
        }
    }
}

/// Billing unit to matrix column. Units missing here (seat, unknown tags)
/// land in no column.
const BILLING_CATEGORIES: &[(BillingUnit, Category)] = &[
    (BillingUnit::Token, Category::ApiBilling),
    (BillingUnit::GpuHour, Category::ApiBilling),
    (BillingUnit::Subscription, Category::Subscription),
    (BillingUnit::Usage, Category::Subscription),
    (BillingUnit::License, Category::Subscription),
    (BillingUnit::Commission, Category::Commission),
    (BillingUnit::Project, Category::Project),
    (BillingUnit::Advertising, Category::Advertising),
    (BillingUnit::Performance, Category::Performance),
];

pub fn category_of(unit: BillingUnit) -> Option<Category> {
    BILLING_CATEGORIES
        .iter()
        .find(|(u, _)| *u == unit)
        .map(|(_, category)| *category)
}

/// A method's column comes from its first billing unit only.
pub fn method_category(method: &MonetizationMethod) -> Option<Category> {
    method.billing_unit.first().copied().and_then(category_of)
}

/// Restrictions applied to each resolved method before it counts.
/// Empty lists disable the corresponding check.
#[derive(Debug, Clone, Default)]
pub struct MatrixFilter {
    pub audiences: Vec<Audience>,
    pub scalability: Vec<Level>,
    pub data_dependency: Vec<Level>,
}

impl MatrixFilter {
    pub fn admits(&self, method: &MonetizationMethod) -> bool {
        if !self.audiences.is_empty()
            && !self.audiences.iter().any(|a| method.target_audience.contains(a))
        {
            return false;
        }
        if !self.scalability.is_empty() && !self.scalability.contains(&method.scalability_level) {
            return false;
        }
        if !self.data_dependency.is_empty()
            && !self.data_dependency.contains(&method.data_dependency_level)
        {
            return false;
        }
        true
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MatrixCell {
    pub count: usize,
    /// Contributing case ids, first contribution first.
    pub cases: Vec<String>,
}

impl MatrixCell {
    fn add(&mut self, case_id: &str) {
        if !self.cases.iter().any(|id| id == case_id) {
            self.cases.push(case_id.to_string());
            self.count = self.cases.len();
        }
    }
}

/// Case counts by chain level × billing category. Every cell is present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Matrix {
    cells: BTreeMap<ChainLevel, BTreeMap<Category, MatrixCell>>,
}

impl Matrix {
    fn empty() -> Self {
        let cells = ChainLevel::ALL
            .iter()
            .map(|level| {
                let row = Category::ALL
                    .iter()
                    .map(|category| (*category, MatrixCell::default()))
                    .collect();
                (*level, row)
            })
            .collect();
        Self { cells }
    }

    pub fn cell(&self, level: ChainLevel, category: Category) -> &MatrixCell {
        &self.cells[&level][&category]
    }

    pub fn count(&self, level: ChainLevel, category: Category) -> usize {
        self.cell(level, category).count
    }

    pub fn row_total(&self, level: ChainLevel) -> usize {
        self.cells[&level].values().map(|c| c.count).sum()
    }

    pub fn total(&self) -> usize {
        ChainLevel::ALL.iter().map(|level| self.row_total(*level)).sum()
    }

    fn cell_mut(&mut self, level: ChainLevel, category: Category) -> &mut MatrixCell {
        self.cells
            .entry(level)
            .or_default()
            .entry(category)
            .or_default()
    }
}

impl Catalog {
    /// Each case counts at most once per cell, however many of its bindings
    /// land there. Bindings to unknown methods are skipped.
    pub fn matrix_counts(&self, filter: &MatrixFilter) -> Matrix {
        let mut matrix = Matrix::empty();
        for case in self.cases() {
            for binding in &case.monetization_methods {
                let Some(method) = self.method(&binding.method_id) else {
                    continue;
                };
                if !filter.admits(method) {
                    continue;
                }
                if let Some(category) = method_category(method) {
                    matrix.cell_mut(method.chain_level, category).add(&case.id);
                }
            }
        }
        matrix
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::sample_catalog;
    use std::collections::BTreeSet;

    #[test]
    fn test_category_table() {
        assert_eq!(category_of(BillingUnit::Token), Some(Category::ApiBilling));
        assert_eq!(category_of(BillingUnit::GpuHour), Some(Category::ApiBilling));
        assert_eq!(category_of(BillingUnit::License), Some(Category::Subscription));
        assert_eq!(category_of(BillingUnit::Advertising), Some(Category::Advertising));
        assert_eq!(category_of(BillingUnit::Seat), None);
        assert_eq!(category_of(BillingUnit::Unknown), None);
    }

    #[test]
    fn test_method_without_billing_units_has_no_column() {
        let catalog = sample_catalog();
        let freemium = catalog.method("freemium").unwrap();
        assert!(freemium.billing_unit.is_empty());
        assert_eq!(method_category(freemium), None);
    }

    #[test]
    fn test_unfiltered_counts() {
        let matrix = sample_catalog().matrix_counts(&MatrixFilter::default());

        assert_eq!(matrix.count(ChainLevel::Model, Category::ApiBilling), 3);
        assert_eq!(matrix.count(ChainLevel::Model, Category::Subscription), 3);
        assert_eq!(matrix.count(ChainLevel::Application, Category::Subscription), 5);
        assert_eq!(matrix.count(ChainLevel::Compute, Category::ApiBilling), 1);
        assert_eq!(matrix.total(), 12);
        assert_eq!(
            matrix.cell(ChainLevel::Model, Category::Subscription).cases,
            vec!["case-002", "case-004", "case-007"]
        );
    }

    #[test]
    fn test_case_counted_once_per_cell() {
        // Runway binds two methods that both land in application/subscription.
        let matrix = sample_catalog().matrix_counts(&MatrixFilter::default());
        let cell = matrix.cell(ChainLevel::Application, Category::Subscription);
        assert_eq!(cell.cases.iter().filter(|id| *id == "case-006").count(), 1);
        assert_eq!(cell.count, cell.cases.len());
    }

    #[test]
    fn test_cells_match_case_bindings() {
        let catalog = sample_catalog();
        let mut expected: BTreeMap<(ChainLevel, Category), BTreeSet<&str>> = BTreeMap::new();
        for case in catalog.cases() {
            for binding in &case.monetization_methods {
                let Some(method) = catalog.methods().iter().find(|m| m.id == binding.method_id)
                else {
                    continue;
                };
                if let Some(category) = method.billing_unit.first().and_then(|u| category_of(*u)) {
                    expected
                        .entry((method.chain_level, category))
                        .or_default()
                        .insert(case.id.as_str());
                }
            }
        }

        let matrix = catalog.matrix_counts(&MatrixFilter::default());
        for level in ChainLevel::ALL {
            let mut at_level: BTreeSet<&str> = BTreeSet::new();
            for category in Category::ALL {
                let want = expected.get(&(level, category)).cloned().unwrap_or_default();
                let cell = matrix.cell(level, category);
                let got: BTreeSet<&str> = cell.cases.iter().map(String::as_str).collect();
                assert_eq!(got, want, "{:?}/{:?}", level, category);
                assert_eq!(cell.count, want.len());
                at_level.extend(want);
            }
            for category in Category::ALL {
                assert!(matrix.count(level, category) <= at_level.len());
            }
        }
    }

    #[test]
    fn test_audience_filter() {
        let filter = MatrixFilter {
            audiences: vec![Audience::Consumer],
            ..Default::default()
        };
        let matrix = sample_catalog().matrix_counts(&filter);
        assert_eq!(matrix.count(ChainLevel::Application, Category::Subscription), 5);
        assert_eq!(matrix.count(ChainLevel::Model, Category::ApiBilling), 0);
        assert_eq!(matrix.total(), 5);
    }

    #[test]
    fn test_level_filters() {
        let filter = MatrixFilter {
            scalability: vec![Level::Low],
            ..Default::default()
        };
        let matrix = sample_catalog().matrix_counts(&filter);
        assert_eq!(matrix.count(ChainLevel::Model, Category::Subscription), 3);
        assert_eq!(matrix.total(), 3);

        let filter = MatrixFilter {
            data_dependency: vec![Level::Low],
            ..Default::default()
        };
        let matrix = sample_catalog().matrix_counts(&filter);
        assert_eq!(matrix.count(ChainLevel::Compute, Category::ApiBilling), 1);
        assert_eq!(matrix.count(ChainLevel::Model, Category::ApiBilling), 0);
    }

    #[test]
    fn test_empty_catalog_matrix_is_zero_filled() {
        let matrix = Catalog::new().matrix_counts(&MatrixFilter::default());
        assert_eq!(matrix.total(), 0);
        for level in ChainLevel::ALL {
            for category in Category::ALL {
                assert_eq!(matrix.count(level, category), 0);
            }
        }
    }
}
