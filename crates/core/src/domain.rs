//! Search domain construction
//!
//! Turns the free text typed in the directory search bar into a structured
//! filter. The search string is split on single spaces into sub-terms;
//! every sub-term must be found (case-insensitively) in at least one of the
//! company name, city, country name or industry names. The fixed listing
//! predicates (`active`, `is_company`, status) always apply.
//!
//! A [`SearchFilter`] can be evaluated directly against a [`Partner`] or
//! rendered into a parameterised PostgreSQL `WHERE` clause.
//!
//! # Examples
//!
//! ```
//! use studiomap_core::domain::SearchDomainBuilder;
//! use studiomap_core::types::CompanyStatus;
//!
//! let domain = SearchDomainBuilder::new("paris animation", CompanyStatus::Open).build();
//! assert_eq!(domain.filter.sub_terms(), vec!["paris", "animation"]);
//! assert_eq!(domain.limit, None);
//! ```

use serde::{Deserialize, Serialize};
use sqlx::{Postgres, QueryBuilder};
use tracing::debug;

use crate::models::Partner;
use crate::types::CompanyStatus;

/// Field a sub-term is matched against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldPath {
    Name,
    City,
    CountryName,
    IndustryName,
}

impl FieldPath {
    /// Every searchable field, in the order predicates are emitted
    pub const ALL: [FieldPath; 4] = [
        FieldPath::Name,
        FieldPath::City,
        FieldPath::CountryName,
        FieldPath::IndustryName,
    ];

    /// Dotted path of the field on the partner model
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::City => "city",
            Self::CountryName => "country_id.name",
            Self::IndustryName => "industry_ids.name",
        }
    }
}

impl std::fmt::Display for FieldPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// "field case-insensitively contains term"
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldPredicate {
    pub field: FieldPath,
    pub term: String,
}

impl FieldPredicate {
    pub fn new<S: Into<String>>(field: FieldPath, term: S) -> Self {
        Self {
            field,
            term: term.into(),
        }
    }

    /// Evaluate the predicate against an in-memory partner
    pub fn matches(&self, partner: &Partner) -> bool {
        let needle = self.term.to_lowercase();
        let contains = |value: &str| value.to_lowercase().contains(&needle);
        match self.field {
            FieldPath::Name => contains(&partner.name),
            FieldPath::City => partner.city.as_deref().is_some_and(contains),
            FieldPath::CountryName => partner.country_name().is_some_and(contains),
            FieldPath::IndustryName => partner.industry_names().any(contains),
        }
    }

    fn push_sql(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        let pattern = like_pattern(&self.term);
        match self.field {
            FieldPath::Name => {
                qb.push("rp.name ILIKE ").push_bind(pattern);
            }
            FieldPath::City => {
                qb.push("rp.city ILIKE ").push_bind(pattern);
            }
            FieldPath::CountryName => {
                qb.push(
                    "EXISTS (SELECT 1 FROM res_country c \
                     WHERE c.id = rp.country_id AND c.name ILIKE ",
                )
                .push_bind(pattern)
                .push(")");
            }
            FieldPath::IndustryName => {
                qb.push(
                    "EXISTS (SELECT 1 FROM res_industry_res_partner_rel rel \
                     JOIN res_industry ind ON ind.id = rel.res_industry_id \
                     WHERE rel.res_partner_id = rp.id AND ind.name ILIKE ",
                )
                .push_bind(pattern)
                .push(")");
            }
        }
    }
}

/// OR group of the field predicates built for one sub-term
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermGroup {
    pub term: String,
    pub predicates: Vec<FieldPredicate>,
}

impl TermGroup {
    /// Group matching `term` in any searchable field
    pub fn any_field<S: Into<String>>(term: S) -> Self {
        let term = term.into();
        let predicates = FieldPath::ALL
            .iter()
            .map(|field| FieldPredicate::new(*field, term.clone()))
            .collect();
        Self { term, predicates }
    }

    pub fn matches(&self, partner: &Partner) -> bool {
        self.predicates.iter().any(|p| p.matches(partner))
    }
}

/// Filter selecting the companies shown in a listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchFilter {
    pub status: CompanyStatus,
    /// ANDed together; empty means no text constraint
    pub groups: Vec<TermGroup>,
}

impl SearchFilter {
    /// Sub-terms the filter was built from
    pub fn sub_terms(&self) -> Vec<&str> {
        self.groups.iter().map(|g| g.term.as_str()).collect()
    }

    /// True when only the fixed predicates apply
    pub fn is_unconstrained(&self) -> bool {
        self.groups.is_empty()
    }

    /// Evaluate the whole filter against an in-memory partner
    pub fn matches(&self, partner: &Partner) -> bool {
        partner.is_listed(self.status) && self.groups.iter().all(|g| g.matches(partner))
    }

    /// Append the filter as a SQL condition on the `rp` partner alias
    ///
    /// Every user supplied value is bound as a parameter.
    pub fn push_sql(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        qb.push("rp.active = TRUE AND rp.is_company = TRUE AND rp.state = ")
            .push_bind(self.status.as_str());

        for group in &self.groups {
            qb.push(" AND (");
            for (i, predicate) in group.predicates.iter().enumerate() {
                if i > 0 {
                    qb.push(" OR ");
                }
                predicate.push_sql(qb);
            }
            qb.push(")");
        }
    }
}

/// Ordering applied to search results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortOrder {
    /// Alphabetical by company name, ties broken by id
    #[default]
    NameAsc,
}

impl SortOrder {
    pub fn sql(&self) -> &'static str {
        match self {
            Self::NameAsc => "rp.name ASC, rp.id ASC",
        }
    }

    pub fn sort(&self, partners: &mut [Partner]) {
        match self {
            Self::NameAsc => partners.sort_by(|a, b| {
                a.name
                    .to_lowercase()
                    .cmp(&b.name.to_lowercase())
                    .then(a.id.cmp(&b.id))
            }),
        }
    }
}

/// Filter plus ordering and paging, ready for the persistence layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchDomain {
    pub filter: SearchFilter,
    pub order: SortOrder,
    pub limit: Option<usize>,
    pub offset: usize,
}

/// Builder for [`SearchDomain`]
#[derive(Debug, Clone)]
pub struct SearchDomainBuilder {
    search: String,
    status: CompanyStatus,
    limit: Option<usize>,
    offset: usize,
}

impl SearchDomainBuilder {
    pub fn new<S: Into<String>>(search: S, status: CompanyStatus) -> Self {
        Self {
            search: search.into(),
            status,
            limit: None,
            offset: 0,
        }
    }

    /// Page size for paginated contexts
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Select the zero based `page` of `page_size` results
    pub fn page(mut self, page: usize, page_size: usize) -> Self {
        self.limit = Some(page_size);
        self.offset = page * page_size;
        self
    }

    pub fn build(self) -> SearchDomain {
        debug!(search = %self.search, status = %self.status, "building search domain");

        let groups: Vec<TermGroup> = split_sub_terms(&self.search)
            .map(TermGroup::any_field)
            .collect();

        let domain = SearchDomain {
            filter: SearchFilter {
                status: self.status,
                groups,
            },
            order: SortOrder::NameAsc,
            limit: self.limit,
            offset: self.offset,
        };
        debug!(sub_terms = ?domain.filter.sub_terms(), "search domain built");
        domain
    }
}

/// Split a search string into sub-terms
///
/// Splits on single spaces only; the empty pieces produced by leading,
/// trailing or repeated spaces are skipped.
pub fn split_sub_terms(search: &str) -> impl Iterator<Item = &str> {
    search.split(' ').filter(|term| !term.is_empty())
}

/// `ILIKE` pattern meaning "contains `term` literally"
pub fn like_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}
