//! PostgreSQL partner store
//!
//! Companies live in `res_partner`, with countries, states and industries
//! in their own tables and industries linked through
//! `res_industry_res_partner_rel`. [`PgPartnerStore::setup_schema`] creates
//! the tables on an empty database.

use async_trait::async_trait;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Postgres, QueryBuilder, Row};
use std::collections::HashMap;
use std::time::Instant;
use tracing::{debug, info};

use super::PartnerStore;
use crate::domain::SearchDomain;
use crate::models::{
    Calls, CountryCount, Industry, LocateMeStat, MapRow, NamedRef, Partner, SocialNetworks,
};
use crate::profile::{ImageChange, PartnerForm};
use crate::types::{CompanyStatus, PartnerId, UserId};
use crate::{Result, StudiomapError};

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS res_country (
        id BIGSERIAL PRIMARY KEY,
        name TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS res_country_state (
        id BIGSERIAL PRIMARY KEY,
        country_id BIGINT REFERENCES res_country(id),
        name TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS res_industry (
        id BIGSERIAL PRIMARY KEY,
        name TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS res_partner (
        id BIGSERIAL PRIMARY KEY,
        name TEXT NOT NULL,
        active BOOLEAN NOT NULL DEFAULT TRUE,
        is_company BOOLEAN NOT NULL DEFAULT FALSE,
        state TEXT NOT NULL DEFAULT 'open',
        email TEXT,
        website TEXT,
        street TEXT,
        street2 TEXT,
        city TEXT,
        zip TEXT,
        state_id BIGINT REFERENCES res_country_state(id),
        country_id BIGINT REFERENCES res_country(id),
        partner_latitude DOUBLE PRECISION,
        partner_longitude DOUBLE PRECISION,
        image TEXT,
        phone TEXT,
        mobile TEXT,
        fax TEXT,
        linkedin TEXT,
        vimeo TEXT,
        youtube TEXT,
        twitter TEXT,
        facebook TEXT,
        write_date TIMESTAMPTZ
    )",
    "CREATE TABLE IF NOT EXISTS res_industry_res_partner_rel (
        res_partner_id BIGINT NOT NULL REFERENCES res_partner(id) ON DELETE CASCADE,
        res_industry_id BIGINT NOT NULL REFERENCES res_industry(id) ON DELETE CASCADE,
        PRIMARY KEY (res_partner_id, res_industry_id)
    )",
    "CREATE TABLE IF NOT EXISTS res_partner_res_users_rel (
        res_partner_id BIGINT NOT NULL REFERENCES res_partner(id) ON DELETE CASCADE,
        res_users_id BIGINT NOT NULL,
        PRIMARY KEY (res_partner_id, res_users_id)
    )",
    "CREATE TABLE IF NOT EXISTS res_partner_locate_me_stats (
        id BIGSERIAL PRIMARY KEY,
        user_id BIGINT,
        success BOOLEAN NOT NULL,
        latitude DOUBLE PRECISION,
        longitude DOUBLE PRECISION,
        create_date TIMESTAMPTZ NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_res_partner_listing
        ON res_partner (state, is_company, active)",
];

const PARTNER_COLUMNS: &str = "
    SELECT
      rp.id, rp.name, rp.active, rp.is_company, rp.state, rp.email, rp.website,
      rp.street, rp.street2, rp.city, rp.zip,
      rp.partner_latitude, rp.partner_longitude, rp.image,
      rp.phone, rp.mobile, rp.fax,
      rp.linkedin, rp.vimeo, rp.youtube, rp.twitter, rp.facebook,
      rp.write_date,
      st.id AS state_id, st.name AS state_name,
      co.id AS country_id, co.name AS country_name
    FROM res_partner AS rp
    LEFT JOIN res_country_state AS st ON st.id = rp.state_id
    LEFT JOIN res_country AS co ON co.id = rp.country_id
";

const MAP_QUERY: &str = "
    SELECT
      rp.id,
      rp.partner_latitude,
      rp.partner_longitude,
      rp.name,
      rp.city AS city_name,
      res_country_state.name AS state_name,
      res_country.name AS country_name,
      ind.name AS ind_name
    FROM res_partner AS rp
    INNER JOIN res_country_state
      ON rp.state_id = res_country_state.id
    INNER JOIN res_country
      ON rp.country_id = res_country.id
    INNER JOIN res_industry_res_partner_rel AS rpr
      ON rpr.res_partner_id = rp.id
    INNER JOIN res_industry AS ind
      ON ind.id = rpr.res_industry_id
    WHERE
      rp.id = ANY($1)
    ORDER BY rp.id, ind.name
";

const AUTOCOMPLETE_QUERY: &str = "
    SELECT name AS value FROM res_partner
      WHERE name ILIKE $1 AND is_company IS TRUE AND state = 'open'
    UNION
    SELECT name AS value FROM res_country WHERE name ILIKE $1
    UNION
    SELECT name AS value FROM res_industry WHERE name ILIKE $1
    UNION
    SELECT city AS value FROM res_partner
      WHERE city ILIKE $1 AND is_company IS TRUE AND city IS NOT NULL
    ORDER BY value
";

/// Partner store backed by PostgreSQL
#[derive(Clone)]
pub struct PgPartnerStore {
    pool: PgPool,
}

impl PgPartnerStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect a pool to `url`
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await?;
        info!("Connected to PostgreSQL (max {} connections)", max_connections);
        Ok(Self::new(pool))
    }

    /// Create the directory tables if they do not exist yet
    pub async fn setup_schema(&self) -> Result<()> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await.map_err(|e| {
                StudiomapError::database(format!("Schema setup failed: {}", e))
            })?;
        }
        debug!("Directory schema ready");
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn industries_of(&self, ids: &[i64]) -> Result<HashMap<i64, Vec<Industry>>> {
        let rows = sqlx::query(
            "SELECT rel.res_partner_id, ind.id, ind.name
             FROM res_industry_res_partner_rel AS rel
             JOIN res_industry AS ind ON ind.id = rel.res_industry_id
             WHERE rel.res_partner_id = ANY($1)
             ORDER BY ind.name",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        let mut industries: HashMap<i64, Vec<Industry>> = HashMap::new();
        for row in rows {
            let partner_id: i64 = row.try_get("res_partner_id")?;
            industries
                .entry(partner_id)
                .or_default()
                .push(NamedRef::new(row.try_get("id")?, row.try_get::<String, _>("name")?));
        }
        Ok(industries)
    }

    async fn fetch_partners(&self, qb: &mut QueryBuilder<'_, Postgres>) -> Result<Vec<Partner>> {
        let rows = qb.build().fetch_all(&self.pool).await?;
        let mut partners = rows
            .iter()
            .map(partner_from_row)
            .collect::<Result<Vec<_>>>()?;

        let ids: Vec<i64> = partners.iter().map(|p| p.id.0).collect();
        let mut industries = self.industries_of(&ids).await?;
        for partner in &mut partners {
            partner.industries = industries.remove(&partner.id.0).unwrap_or_default();
        }
        Ok(partners)
    }

    async fn write_industries(
        &self,
        tx: &mut sqlx::Transaction<'_, Postgres>,
        id: PartnerId,
        industry_ids: &[i64],
    ) -> Result<()> {
        sqlx::query("DELETE FROM res_industry_res_partner_rel WHERE res_partner_id = $1")
            .bind(id.0)
            .execute(&mut **tx)
            .await?;
        sqlx::query(
            "INSERT INTO res_industry_res_partner_rel (res_partner_id, res_industry_id)
             SELECT $1, UNNEST($2::bigint[])",
        )
        .bind(id.0)
        .bind(industry_ids)
        .execute(&mut **tx)
        .await
        .map_err(missing_relation)?;
        Ok(())
    }

    fn push_form_assignments(qb: &mut QueryBuilder<'_, Postgres>, form: &PartnerForm) -> bool {
        let mut separated = qb.separated(", ");
        separated.push("write_date = NOW()");
        let mut changed = false;

        if let Some(name) = &form.name {
            separated.push("name = ").push_bind_unseparated(name.clone());
            changed = true;
        }
        for (column, value) in form.text_fields() {
            if let Some(value) = value {
                separated
                    .push(format!("{} = ", column))
                    .push_bind_unseparated(value.clone());
                changed = true;
            } else if form.clears(column) {
                separated.push(format!("{} = NULL", column));
                changed = true;
            }
        }
        if let Some(country_id) = form.country_id {
            separated
                .push("country_id = ")
                .push_bind_unseparated(country_id);
            changed = true;
        } else if form.clears("country_id") {
            separated.push("country_id = NULL");
            changed = true;
        }
        match &form.image {
            ImageChange::Keep => {}
            ImageChange::Remove => {
                separated.push("image = NULL");
                changed = true;
            }
            ImageChange::Replace(encoded) => {
                separated
                    .push("image = ")
                    .push_bind_unseparated(encoded.clone());
                changed = true;
            }
        }
        changed
    }
}

/// A form referencing an unknown country or industry breaks a foreign key
fn missing_relation(error: sqlx::Error) -> StudiomapError {
    match error {
        sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
            StudiomapError::not_found(format!(
                "related record ({})",
                db.constraint().unwrap_or("unknown relation")
            ))
        }
        other => other.into(),
    }
}

fn partner_from_row(row: &PgRow) -> Result<Partner> {
    let status: String = row.try_get("state")?;
    let state_id: Option<i64> = row.try_get("state_id")?;
    let country_id: Option<i64> = row.try_get("country_id")?;

    Ok(Partner {
        id: PartnerId(row.try_get("id")?),
        name: row.try_get("name")?,
        active: row.try_get("active")?,
        is_company: row.try_get("is_company")?,
        status: status.parse().unwrap_or(CompanyStatus::Closed),
        email: row.try_get("email")?,
        website: row.try_get("website")?,
        street: row.try_get("street")?,
        street2: row.try_get("street2")?,
        city: row.try_get("city")?,
        zip: row.try_get("zip")?,
        state: match state_id {
            Some(id) => Some(NamedRef::new(id, row.try_get::<String, _>("state_name")?)),
            None => None,
        },
        country: match country_id {
            Some(id) => Some(NamedRef::new(id, row.try_get::<String, _>("country_name")?)),
            None => None,
        },
        industries: Vec::new(),
        latitude: row.try_get("partner_latitude")?,
        longitude: row.try_get("partner_longitude")?,
        image: row.try_get("image")?,
        calls: Calls {
            phone: row.try_get("phone")?,
            mobile: row.try_get("mobile")?,
            fax: row.try_get("fax")?,
        },
        social_networks: SocialNetworks {
            linkedin: row.try_get("linkedin")?,
            vimeo: row.try_get("vimeo")?,
            youtube: row.try_get("youtube")?,
            twitter: row.try_get("twitter")?,
            facebook: row.try_get("facebook")?,
        },
        write_date: row.try_get("write_date")?,
    })
}

#[async_trait]
impl PartnerStore for PgPartnerStore {
    async fn search(&self, domain: &SearchDomain) -> Result<Vec<Partner>> {
        let start = Instant::now();
        let mut qb = QueryBuilder::<Postgres>::new(PARTNER_COLUMNS);
        qb.push(" WHERE ");
        domain.filter.push_sql(&mut qb);
        qb.push(" ORDER BY ").push(domain.order.sql());
        if let Some(limit) = domain.limit {
            qb.push(" LIMIT ").push_bind(limit as i64);
        }
        if domain.offset > 0 {
            qb.push(" OFFSET ").push_bind(domain.offset as i64);
        }

        let partners = self.fetch_partners(&mut qb).await?;
        debug!(
            "Query time: {:?} ({} partners)",
            start.elapsed(),
            partners.len()
        );
        Ok(partners)
    }

    async fn map_rows(&self, ids: &[PartnerId]) -> Result<Vec<MapRow>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<i64> = ids.iter().map(|id| id.0).collect();

        let rows = sqlx::query(MAP_QUERY)
            .bind(&ids)
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|row| {
                Ok(MapRow {
                    id: PartnerId(row.try_get("id")?),
                    latitude: row.try_get("partner_latitude")?,
                    longitude: row.try_get("partner_longitude")?,
                    name: row.try_get("name")?,
                    city: row.try_get("city_name")?,
                    state_name: row.try_get("state_name")?,
                    country_name: row.try_get("country_name")?,
                    industry_name: row.try_get("ind_name")?,
                })
            })
            .collect()
    }

    async fn get(&self, id: PartnerId) -> Result<Partner> {
        let mut qb = QueryBuilder::<Postgres>::new(PARTNER_COLUMNS);
        qb.push(" WHERE rp.id = ").push_bind(id.0);
        self.fetch_partners(&mut qb)
            .await?
            .pop()
            .ok_or_else(|| StudiomapError::not_found(format!("partner {}", id)))
    }

    async fn autocomplete(&self, term: &str) -> Result<Vec<String>> {
        if term.is_empty() {
            return Ok(Vec::new());
        }
        let values = sqlx::query_scalar::<_, String>(AUTOCOMPLETE_QUERY)
            .bind(crate::domain::like_pattern(term))
            .fetch_all(&self.pool)
            .await?;
        debug!("Result from autocomplete: {:?}", values);
        Ok(values)
    }

    async fn create_partner(&self, form: &PartnerForm) -> Result<Partner> {
        let name = form.require_name()?;
        let mut tx = self.pool.begin().await?;

        let id: i64 = sqlx::query_scalar(
            "INSERT INTO res_partner (name, is_company, active, state)
             VALUES ($1, TRUE, TRUE, 'open') RETURNING id",
        )
        .bind(name)
        .fetch_one(&mut *tx)
        .await?;
        let id = PartnerId(id);

        let mut qb = QueryBuilder::<Postgres>::new("UPDATE res_partner SET ");
        if Self::push_form_assignments(&mut qb, form) {
            qb.push(" WHERE id = ").push_bind(id.0);
            qb.build()
                .execute(&mut *tx)
                .await
                .map_err(missing_relation)?;
        }
        if let Some(industry_ids) = &form.industry_ids {
            self.write_industries(&mut tx, id, industry_ids).await?;
        }
        tx.commit().await?;

        info!("Created partner {}", id);
        self.get(id).await
    }

    async fn update_partner(&self, id: PartnerId, form: &PartnerForm) -> Result<Partner> {
        let mut tx = self.pool.begin().await?;

        let mut qb = QueryBuilder::<Postgres>::new("UPDATE res_partner SET ");
        Self::push_form_assignments(&mut qb, form);
        qb.push(" WHERE id = ").push_bind(id.0);
        let result = qb
            .build()
            .execute(&mut *tx)
            .await
            .map_err(missing_relation)?;
        if result.rows_affected() == 0 {
            return Err(StudiomapError::not_found(format!("partner {}", id)));
        }

        if let Some(industry_ids) = &form.industry_ids {
            self.write_industries(&mut tx, id, industry_ids).await?;
        }
        tx.commit().await?;

        info!("Updated partner {}", id);
        self.get(id).await
    }

    async fn set_favorite(&self, id: PartnerId, user: UserId, favorite: bool) -> Result<()> {
        let query = if favorite {
            "INSERT INTO res_partner_res_users_rel (res_partner_id, res_users_id)
             VALUES ($1, $2) ON CONFLICT DO NOTHING"
        } else {
            "DELETE FROM res_partner_res_users_rel
             WHERE res_partner_id = $1 AND res_users_id = $2"
        };
        sqlx::query(query)
            .bind(id.0)
            .bind(user.0)
            .execute(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
                    StudiomapError::not_found(format!("partner {}", id))
                }
                other => other.into(),
            })?;
        Ok(())
    }

    async fn is_favorite(&self, id: PartnerId, user: UserId) -> Result<bool> {
        let found: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM res_partner_res_users_rel
             WHERE res_partner_id = $1 AND res_users_id = $2)",
        )
        .bind(id.0)
        .bind(user.0)
        .fetch_one(&self.pool)
        .await?;
        Ok(found)
    }

    async fn add_locate_me_stat(&self, stat: &LocateMeStat) -> Result<()> {
        sqlx::query(
            "INSERT INTO res_partner_locate_me_stats
               (user_id, success, latitude, longitude, create_date)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(stat.user_id.map(|u| u.0))
        .bind(stat.success)
        .bind(stat.latitude)
        .bind(stat.longitude)
        .bind(stat.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn studios_in_country(
        &self,
        country_id: i64,
        exclude: &[PartnerId],
    ) -> Result<Vec<Partner>> {
        let exclude: Vec<i64> = exclude.iter().map(|id| id.0).collect();
        let mut qb = QueryBuilder::<Postgres>::new(PARTNER_COLUMNS);
        qb.push(
            " WHERE rp.active = TRUE AND rp.is_company = TRUE AND rp.state = 'open' \
             AND rp.image IS NOT NULL AND rp.country_id = ",
        )
        .push_bind(country_id)
        .push(" AND NOT (rp.id = ANY(")
        .push_bind(exclude)
        .push("))");
        self.fetch_partners(&mut qb).await
    }

    async fn count_by_country(&self) -> Result<Vec<CountryCount>> {
        let rows = sqlx::query(
            "SELECT co.id, co.name, COUNT(rp.id) AS total
             FROM res_country AS co
             JOIN res_partner AS rp ON rp.country_id = co.id
             WHERE rp.active = TRUE AND rp.is_company = TRUE
             GROUP BY co.id, co.name
             ORDER BY co.id",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                let total: i64 = row.try_get("total")?;
                Ok(CountryCount {
                    country: NamedRef::new(row.try_get("id")?, row.try_get::<String, _>("name")?),
                    count: total as usize,
                })
            })
            .collect()
    }
}
