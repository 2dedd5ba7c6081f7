//! In-process partner store
//!
//! Evaluates search domains directly against the stored partners and
//! emulates the inner joins of the geo query. Names sort case-insensitively
//! and industries by name, close to what PostgreSQL returns under a
//! case-insensitive collation; byte-level collation details may differ.

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;
use tracing::{debug, info};

use super::PartnerStore;
use crate::domain::SearchDomain;
use crate::models::{CountryCount, Industry, LocateMeStat, MapRow, NamedRef, Partner};
use crate::profile::PartnerForm;
use crate::types::{CompanyStatus, PartnerId, UserId};
use crate::{Result, StudiomapError};

#[derive(Debug, Default)]
struct Tables {
    partners: BTreeMap<PartnerId, Partner>,
    countries: BTreeMap<i64, NamedRef>,
    industries: BTreeMap<i64, Industry>,
    favorites: HashMap<PartnerId, BTreeSet<UserId>>,
    locate_me: Vec<LocateMeStat>,
}

impl Tables {
    fn next_id(&self) -> PartnerId {
        PartnerId(self.partners.keys().next_back().map_or(1, |id| id.0 + 1))
    }

    fn register_relations(&mut self, partner: &Partner) {
        if let Some(country) = &partner.country {
            self.countries.insert(country.id, country.clone());
        }
        for industry in &partner.industries {
            self.industries.insert(industry.id, industry.clone());
        }
    }

    fn apply_form(&self, partner: &mut Partner, form: &PartnerForm) -> Result<()> {
        form.apply_scalars(partner);

        if let Some(country_id) = form.country_id {
            let country = self
                .countries
                .get(&country_id)
                .ok_or_else(|| StudiomapError::not_found(format!("country {}", country_id)))?;
            partner.country = Some(country.clone());
        } else if form.clears("country_id") {
            partner.country = None;
        }

        if let Some(ids) = &form.industry_ids {
            partner.industries = ids
                .iter()
                .map(|id| {
                    self.industries
                        .get(id)
                        .cloned()
                        .ok_or_else(|| StudiomapError::not_found(format!("industry {}", id)))
                })
                .collect::<Result<_>>()?;
            sort_industries(&mut partner.industries);
        }

        partner.write_date = Some(Utc::now());
        Ok(())
    }
}

fn sort_industries(industries: &mut [Industry]) {
    industries.sort_by(|a, b| a.name.cmp(&b.name));
}

/// Partner store kept in memory
#[derive(Debug, Default)]
pub struct InMemoryPartnerStore {
    tables: RwLock<Tables>,
}

impl InMemoryPartnerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding `partners`
    ///
    /// Their countries and industries become available to profile forms.
    pub fn with_partners<I: IntoIterator<Item = Partner>>(partners: I) -> Self {
        let store = Self::new();
        for partner in partners {
            store.insert(partner);
        }
        store
    }

    /// Load partners from a JSON or YAML fixture file
    pub fn from_fixture_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let partners: Vec<Partner> = match serde_yaml::from_str(&content) {
            Ok(partners) => partners,
            Err(_) => serde_json::from_str(&content)?,
        };
        info!("Loaded {} partners from {}", partners.len(), path.display());
        Ok(Self::with_partners(partners))
    }

    /// Insert or replace a partner
    pub fn insert(&self, mut partner: Partner) {
        sort_industries(&mut partner.industries);
        let mut tables = self.tables.write();
        tables.register_relations(&partner);
        tables.partners.insert(partner.id, partner);
    }

    /// Make a country selectable in profile forms
    pub fn add_country(&self, country: NamedRef) {
        self.tables.write().countries.insert(country.id, country);
    }

    /// Make an industry selectable in profile forms
    pub fn add_industry(&self, industry: Industry) {
        self.tables.write().industries.insert(industry.id, industry);
    }

    /// Recorded "locate me" statistics, oldest first
    pub fn locate_me_stats(&self) -> Vec<LocateMeStat> {
        self.tables.read().locate_me.clone()
    }

    pub fn len(&self) -> usize {
        self.tables.read().partners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl PartnerStore for InMemoryPartnerStore {
    async fn search(&self, domain: &SearchDomain) -> Result<Vec<Partner>> {
        let tables = self.tables.read();
        let mut partners: Vec<Partner> = tables
            .partners
            .values()
            .filter(|p| domain.filter.matches(p))
            .cloned()
            .collect();
        drop(tables);

        domain.order.sort(&mut partners);
        let partners: Vec<Partner> = partners
            .into_iter()
            .skip(domain.offset)
            .take(domain.limit.unwrap_or(usize::MAX))
            .collect();

        debug!("In-memory search returned {} partners", partners.len());
        Ok(partners)
    }

    async fn map_rows(&self, ids: &[PartnerId]) -> Result<Vec<MapRow>> {
        let tables = self.tables.read();
        let mut rows = Vec::new();

        for id in ids {
            let Some(partner) = tables.partners.get(id) else {
                continue;
            };
            let (Some(state), Some(country)) = (&partner.state, &partner.country) else {
                continue;
            };

            let mut industries: Vec<&Industry> = partner.industries.iter().collect();
            industries.sort_by(|a, b| a.name.cmp(&b.name));

            for industry in industries {
                rows.push(MapRow {
                    id: partner.id,
                    latitude: partner.latitude,
                    longitude: partner.longitude,
                    name: partner.name.clone(),
                    city: partner.city.clone(),
                    state_name: state.name.clone(),
                    country_name: country.name.clone(),
                    industry_name: industry.name.clone(),
                });
            }
        }

        Ok(rows)
    }

    async fn get(&self, id: PartnerId) -> Result<Partner> {
        self.tables
            .read()
            .partners
            .get(&id)
            .cloned()
            .ok_or_else(|| StudiomapError::not_found(format!("partner {}", id)))
    }

    async fn autocomplete(&self, term: &str) -> Result<Vec<String>> {
        if term.is_empty() {
            return Ok(Vec::new());
        }

        let needle = term.to_lowercase();
        let contains = |value: &str| value.to_lowercase().contains(&needle);
        let tables = self.tables.read();
        let mut values = BTreeSet::new();

        for partner in tables.partners.values().filter(|p| p.is_company) {
            if partner.status == CompanyStatus::Open && contains(&partner.name) {
                values.insert(partner.name.clone());
            }
            if let Some(city) = partner.city.as_deref().filter(|c| contains(c)) {
                values.insert(city.to_string());
            }
        }
        for country in tables.countries.values().filter(|c| contains(&c.name)) {
            values.insert(country.name.clone());
        }
        for industry in tables.industries.values().filter(|i| contains(&i.name)) {
            values.insert(industry.name.clone());
        }

        Ok(values.into_iter().collect())
    }

    async fn create_partner(&self, form: &PartnerForm) -> Result<Partner> {
        let name = form.require_name()?;
        let mut tables = self.tables.write();

        let mut partner = Partner::new(tables.next_id().0, name);
        tables.apply_form(&mut partner, form)?;
        // Users are only allowed to create companies
        partner.is_company = true;

        tables.partners.insert(partner.id, partner.clone());
        info!("Created partner {} ({})", partner.id, partner.name);
        Ok(partner)
    }

    async fn update_partner(&self, id: PartnerId, form: &PartnerForm) -> Result<Partner> {
        let mut tables = self.tables.write();
        let mut partner = tables
            .partners
            .get(&id)
            .cloned()
            .ok_or_else(|| StudiomapError::not_found(format!("partner {}", id)))?;

        tables.apply_form(&mut partner, form)?;
        tables.partners.insert(id, partner.clone());
        info!("Updated partner {}", id);
        Ok(partner)
    }

    async fn set_favorite(&self, id: PartnerId, user: UserId, favorite: bool) -> Result<()> {
        let mut tables = self.tables.write();
        if !tables.partners.contains_key(&id) {
            return Err(StudiomapError::not_found(format!("partner {}", id)));
        }

        let users = tables.favorites.entry(id).or_default();
        if favorite {
            users.insert(user);
        } else {
            users.remove(&user);
        }
        Ok(())
    }

    async fn is_favorite(&self, id: PartnerId, user: UserId) -> Result<bool> {
        Ok(self
            .tables
            .read()
            .favorites
            .get(&id)
            .is_some_and(|users| users.contains(&user)))
    }

    async fn add_locate_me_stat(&self, stat: &LocateMeStat) -> Result<()> {
        self.tables.write().locate_me.push(stat.clone());
        Ok(())
    }

    async fn studios_in_country(
        &self,
        country_id: i64,
        exclude: &[PartnerId],
    ) -> Result<Vec<Partner>> {
        Ok(self
            .tables
            .read()
            .partners
            .values()
            .filter(|p| p.is_listed(CompanyStatus::Open))
            .filter(|p| p.image.is_some())
            .filter(|p| p.country.as_ref().is_some_and(|c| c.id == country_id))
            .filter(|p| !exclude.contains(&p.id))
            .cloned()
            .collect())
    }

    async fn count_by_country(&self) -> Result<Vec<CountryCount>> {
        let tables = self.tables.read();
        let mut counts: BTreeMap<i64, CountryCount> = BTreeMap::new();

        for partner in tables.partners.values().filter(|p| p.active && p.is_company) {
            if let Some(country) = &partner.country {
                counts
                    .entry(country.id)
                    .or_insert_with(|| CountryCount {
                        country: country.clone(),
                        count: 0,
                    })
                    .count += 1;
            }
        }

        Ok(counts.into_values().collect())
    }
}
