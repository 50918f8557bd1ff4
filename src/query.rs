use clap::ValueEnum;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashSet;

use crate::models::{Audience, BillingUnit, Case, ChainLevel, CompanyType, MonetizationMethod, Record};
use crate::store::Catalog;

pub const MAX_COMPARE: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum SortKey {
    /// Most viewed first
    #[default]
    Popular,
    /// Most recently updated first
    Newest,
    /// Alphabetical by name
    Name,
}

/// Facets for the method list. Empty allow-lists and `None` mean "all".
#[derive(Debug, Clone, Default)]
pub struct MethodFilter {
    pub chain_level: Option<ChainLevel>,
    pub audiences: Vec<Audience>,
    pub billing_units: Vec<BillingUnit>,
    pub query: Option<String>,
}

impl MethodFilter {
    pub fn matches(&self, method: &MonetizationMethod) -> bool {
        if let Some(level) = self.chain_level {
            if method.chain_level != level {
                return false;
            }
        }
        if !self.audiences.is_empty()
            && !self.audiences.iter().any(|a| method.target_audience.contains(a))
        {
            return false;
        }
        if !self.billing_units.is_empty()
            && !self.billing_units.iter().any(|u| method.billing_unit.contains(u))
        {
            return false;
        }
        match search_term(&self.query) {
            Some(term) => [&method.name, &method.short_description, &method.definition]
                .iter()
                .any(|field| field.to_lowercase().contains(&term)),
            None => true,
        }
    }

    pub fn apply<'a, I>(&self, methods: I) -> Vec<&'a MonetizationMethod>
    where
        I: IntoIterator<Item = &'a MonetizationMethod>,
    {
        methods.into_iter().filter(|m| self.matches(m)).collect()
    }
}

/// Facets for the case list.
#[derive(Debug, Clone, Default)]
pub struct CaseFilter {
    pub chain_level: Option<ChainLevel>,
    pub company_types: Vec<CompanyType>,
    pub query: Option<String>,
}

impl CaseFilter {
    pub fn matches(&self, case: &Case) -> bool {
        if let Some(level) = self.chain_level {
            if case.chain_level != level {
                return false;
            }
        }
        if !self.company_types.is_empty() && !self.company_types.contains(&case.company_type) {
            return false;
        }
        match search_term(&self.query) {
            Some(term) => [&case.name, &case.company_name, &case.short_description]
                .iter()
                .any(|field| field.to_lowercase().contains(&term)),
            None => true,
        }
    }

    pub fn apply<'a, I>(&self, cases: I) -> Vec<&'a Case>
    where
        I: IntoIterator<Item = &'a Case>,
    {
        cases.into_iter().filter(|c| self.matches(c)).collect()
    }
}

/// Matched as typed, surrounding whitespace included.
fn search_term(query: &Option<String>) -> Option<String> {
    query
        .as_deref()
        .filter(|q| !q.is_empty())
        .map(str::to_lowercase)
}

/// Stable sort; ties keep their incoming order.
pub fn sort_records<T: Record>(records: &mut [&T], key: SortKey) {
    match key {
        SortKey::Popular => records.sort_by(|a, b| b.view_count().cmp(&a.view_count())),
        SortKey::Newest => records.sort_by(|a, b| match (a.updated_ts(), b.updated_ts()) {
            (Some(a), Some(b)) => b.cmp(&a),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }),
        SortKey::Name => records.sort_by(|a, b| {
            a.name()
                .to_lowercase()
                .cmp(&b.name().to_lowercase())
                .then_with(|| a.name().cmp(b.name()))
        }),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Stats {
    pub methods: usize,
    pub cases: usize,
    pub companies: usize,
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum CompareError {
    #[error("Select at least 2 known cases to compare (found {found})")]
    TooFew { found: usize },

    #[error("At most {max} cases can be compared (got {requested})", max = MAX_COMPARE)]
    TooMany { requested: usize },
}

impl Catalog {
    pub fn all<T: Record>(&self) -> &[T] {
        T::records(self)
    }

    /// First record whose id or slug equals `key`, in collection order.
    pub fn get<T: Record>(&self, key: &str) -> Option<&T> {
        T::records(self)
            .iter()
            .find(|r| r.id() == key || r.slug() == key)
    }

    pub fn featured<T: Record>(&self) -> Vec<&T> {
        T::records(self).iter().filter(|r| r.is_featured()).collect()
    }

    pub fn method(&self, key: &str) -> Option<&MonetizationMethod> {
        self.get(key)
    }

    pub fn case(&self, key: &str) -> Option<&Case> {
        self.get(key)
    }

    pub fn filter_methods(&self, filter: &MethodFilter) -> Vec<&MonetizationMethod> {
        filter.apply(self.methods())
    }

    pub fn filter_cases(&self, filter: &CaseFilter) -> Vec<&Case> {
        filter.apply(self.cases())
    }

    /// Cases with at least one binding to `method_id`, in collection order.
    pub fn cases_by_method(&self, method_id: &str) -> Vec<&Case> {
        self.cases()
            .iter()
            .filter(|c| c.references_method(method_id))
            .collect()
    }

    pub fn stats(&self) -> Stats {
        let companies: HashSet<&str> = self.cases().iter().map(|c| c.company_name.as_str()).collect();
        Stats {
            methods: self.all::<MonetizationMethod>().len(),
            cases: self.all::<Case>().len(),
            companies: companies.len(),
        }
    }

    /// Resolves ids or slugs for side-by-side comparison. Unknown keys are
    /// skipped and repeats collapse; at least two cases must remain.
    pub fn compare_cases(&self, keys: &[&str]) -> Result<Vec<&Case>, CompareError> {
        if keys.len() > MAX_COMPARE {
            return Err(CompareError::TooMany { requested: keys.len() });
        }
        let mut picked: Vec<&Case> = Vec::new();
        for key in keys {
            if let Some(case) = self.case(key) {
                if !picked.iter().any(|p| p.id == case.id) {
                    picked.push(case);
                }
            }
        }
        if picked.len() < 2 {
            return Err(CompareError::TooFew { found: picked.len() });
        }
        Ok(picked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::sample_catalog;

    fn ids<T: Record>(records: &[&T]) -> Vec<String> {
        records.iter().map(|r| r.id().to_string()).collect()
    }

    #[test]
    fn test_get_by_id_and_slug_is_unique() {
        let catalog = sample_catalog();
        for method in catalog.all::<MonetizationMethod>() {
            assert_eq!(catalog.method(&method.id).map(|m| &m.id), Some(&method.id));
            assert_eq!(catalog.method(&method.slug).map(|m| &m.id), Some(&method.id));
        }
        for case in catalog.all::<Case>() {
            assert_eq!(catalog.case(&case.id).map(|c| &c.id), Some(&case.id));
            assert_eq!(catalog.case(&case.slug).map(|c| &c.id), Some(&case.id));
        }
    }

    #[test]
    fn test_get_miss_is_none() {
        let catalog = sample_catalog();
        assert!(catalog.method("no-such-method").is_none());
        assert!(catalog.case("").is_none());
        assert!(Catalog::new().case("case-001").is_none());
    }

    #[test]
    fn test_featured_keeps_order() {
        let catalog = sample_catalog();
        let methods = catalog.featured::<MonetizationMethod>();
        assert_eq!(ids(&methods), vec!["method-001", "method-002", "method-004"]);
        let cases = catalog.featured::<Case>();
        assert_eq!(ids(&cases), vec!["case-001", "case-002", "case-006"]);
    }

    #[test]
    fn test_filter_methods_by_chain_level() {
        let catalog = sample_catalog();
        let filter = MethodFilter {
            chain_level: Some(ChainLevel::Model),
            ..Default::default()
        };
        assert_eq!(ids(&catalog.filter_methods(&filter)), vec!["method-001", "method-004"]);
    }

    #[test]
    fn test_filter_methods_allow_lists_are_any_match() {
        let catalog = sample_catalog();
        let filter = MethodFilter {
            billing_units: vec![BillingUnit::GpuHour, BillingUnit::Commission],
            ..Default::default()
        };
        assert_eq!(ids(&catalog.filter_methods(&filter)), vec!["method-003", "method-005"]);

        let filter = MethodFilter {
            audiences: vec![Audience::Consumer],
            billing_units: vec![BillingUnit::Usage],
            ..Default::default()
        };
        assert_eq!(ids(&catalog.filter_methods(&filter)), vec!["method-009"]);
    }

    #[test]
    fn test_filter_methods_query_searches_definition() {
        let catalog = sample_catalog();
        let filter = MethodFilter {
            query: Some("佣金".to_string()),
            ..Default::default()
        };
        // only the definition mentions it
        assert_eq!(ids(&catalog.filter_methods(&filter)), vec!["method-005"]);

        let filter = MethodFilter {
            query: Some("gpu".to_string()),
            ..Default::default()
        };
        assert_eq!(ids(&catalog.filter_methods(&filter)), vec!["method-003"]);
    }

    #[test]
    fn test_empty_query_matches_everything() {
        let catalog = sample_catalog();
        let filter = MethodFilter {
            query: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(catalog.filter_methods(&filter).len(), catalog.methods().len());
    }

    #[test]
    fn test_query_is_not_trimmed() {
        let catalog = sample_catalog();
        let query = |q: &str| MethodFilter {
            query: Some(q.to_string()),
            ..Default::default()
        };
        assert_eq!(ids(&catalog.filter_methods(&query("SaaS"))), vec!["method-002"]);
        assert!(catalog.filter_methods(&query("saas ")).is_empty());
    }

    #[test]
    fn test_filter_is_idempotent() {
        let catalog = sample_catalog();
        let filter = MethodFilter {
            audiences: vec![Audience::Enterprise],
            query: Some("部署".to_string()),
            ..Default::default()
        };
        let once = filter.apply(catalog.methods());
        let twice = filter.apply(once.iter().copied());
        assert_eq!(ids(&once), ids(&twice));

        let case_filter = CaseFilter {
            company_types: vec![CompanyType::Unicorn],
            ..Default::default()
        };
        let once = case_filter.apply(catalog.cases());
        let twice = case_filter.apply(once.iter().copied());
        assert_eq!(ids(&once), ids(&twice));
    }

    #[test]
    fn test_filter_cases_by_type_and_company() {
        let catalog = sample_catalog();
        let filter = CaseFilter {
            company_types: vec![CompanyType::Startup],
            ..Default::default()
        };
        assert_eq!(ids(&catalog.filter_cases(&filter)), vec!["case-003", "case-006"]);

        let filter = CaseFilter {
            chain_level: Some(ChainLevel::Application),
            query: Some("openai".to_string()),
            ..Default::default()
        };
        assert_eq!(ids(&catalog.filter_cases(&filter)), vec!["case-007"]);
    }

    #[test]
    fn test_sort_popular() {
        let catalog = sample_catalog();
        let mut cases: Vec<&Case> = catalog.cases().iter().collect();
        sort_records(&mut cases, SortKey::Popular);
        assert_eq!(ids(&cases)[..3], ["case-001", "case-002", "case-003"]);
    }

    #[test]
    fn test_sort_newest_mixes_date_formats() {
        let catalog = sample_catalog();
        let mut methods: Vec<&MonetizationMethod> = catalog.methods().iter().collect();
        sort_records(&mut methods, SortKey::Newest);
        assert_eq!(ids(&methods)[..3], ["method-004", "method-001", "method-009"]);
        assert_eq!(ids(&methods).last().map(String::as_str), Some("method-008"));
    }

    #[test]
    fn test_sort_name_ignores_case() {
        let catalog = sample_catalog();
        let mut cases: Vec<&Case> = catalog.cases().iter().collect();
        sort_records(&mut cases, SortKey::Name);
        let names: Vec<&str> = cases.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names[..3], ["ChatGPT Enterprise", "Claude", "CoreWeave"]);
    }

    #[test]
    fn test_cases_by_method() {
        let catalog = sample_catalog();
        assert_eq!(
            ids(&catalog.cases_by_method("method-004")),
            vec!["case-002", "case-004", "case-007"]
        );
        assert!(catalog.cases_by_method("nonexistent-id").is_empty());
    }

    #[test]
    fn test_dangling_binding_resolves_to_none() {
        let catalog = sample_catalog();
        let case = catalog.case("midjourney").unwrap();
        let resolved: Vec<Option<&MonetizationMethod>> = case
            .monetization_methods
            .iter()
            .map(|b| catalog.method(&b.method_id))
            .collect();
        assert!(resolved[0].is_some());
        assert!(resolved[1].is_none());
    }

    #[test]
    fn test_stats_counts_distinct_companies() {
        let catalog = sample_catalog();
        assert_eq!(
            catalog.stats(),
            Stats { methods: 9, cases: 7, companies: 6 }
        );
        assert_eq!(Catalog::new().stats(), Stats { methods: 0, cases: 0, companies: 0 });
    }

    #[test]
    fn test_compare_cases() {
        let catalog = sample_catalog();
        let picked = catalog.compare_cases(&["case-001", "anthropic-claude", "case-001"]).unwrap();
        assert_eq!(ids(&picked), vec!["case-001", "case-002"]);

        assert_eq!(
            catalog.compare_cases(&["case-001", "nope"]).unwrap_err(),
            CompareError::TooFew { found: 1 }
        );
        assert_eq!(
            catalog
                .compare_cases(&["case-001", "case-002", "case-003", "case-004"])
                .unwrap_err(),
            CompareError::TooMany { requested: 4 }
        );
    }

    #[test]
    fn test_primary_binding_first_primary_wins() {
        let catalog = sample_catalog();
        let glm = catalog.case("zhipu-glm").unwrap();
        assert_eq!(glm.primary_binding().map(|b| b.method_id.as_str()), Some("method-004"));
    }

    #[test]
    fn test_empty_catalog_queries_are_empty() {
        let catalog = Catalog::new();
        assert!(catalog.all::<MonetizationMethod>().is_empty());
        assert!(catalog.featured::<Case>().is_empty());
        assert!(catalog.filter_methods(&MethodFilter::default()).is_empty());
        assert!(catalog.filter_cases(&CaseFilter::default()).is_empty());
        assert!(catalog.cases_by_method("method-001").is_empty());
    }
}
