//! List and map payload shaping
//!
//! Both listing pages load their data as JSON built here:
//!
//! - the list view receives an array of row summaries, one per matched
//!   company, rendered into a table client side;
//! - the map view receives an object mapping each company id to
//!   `[latitude, longitude, info_window_html]`.
//!
//! HTML fragments are rendered with handlebars so that every value coming
//! from the database is escaped.

use handlebars::Handlebars;
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::json;
use std::collections::BTreeMap;
use tracing::debug;

use crate::models::{company_url, MapRow, Partner};
use crate::types::{CompanyStatus, ListingKind, PartnerId};
use crate::Result;

const LOGO_TEMPLATE: &str =
    r#"<img itemprop="image" class="img img-responsive" src="{{src}}"/>"#;

const NAME_TEMPLATE: &str = r#"<a href="{{url}}">{{name}}</a>"#;

const INDUSTRY_TEMPLATE: &str = r#"<a class="label label-info" href="{{{href}}}">{{name}}</a>"#;

const INFO_WINDOW_TEMPLATE: &str = concat!(
    r#"<div class="info-window">"#,
    r#"<h4><a href="{{url}}">{{name}}</a></h4>"#,
    r#"{{#if location}}<p class="location">{{location}}</p>{{/if}}"#,
    r#"<p class="industries">{{{industries}}}</p>"#,
    r#"</div>"#,
);

/// One row of the list view table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListRow {
    pub logo: String,
    pub name: String,
    pub email: String,
    pub industries: String,
    pub city: Option<String>,
    pub state_name: Option<String>,
    pub country_name: Option<String>,
}

/// One marker of the map view: latitude, longitude and info window HTML
pub type MapMarker = (f64, f64, String);

/// Renders the list and map payloads
#[derive(Debug)]
pub struct PayloadRenderer {
    handlebars: Handlebars<'static>,
}

impl PayloadRenderer {
    /// Create a renderer with the built-in fragments registered
    pub fn new() -> Result<Self> {
        let mut handlebars = Handlebars::new();
        for (name, template) in [
            ("logo", LOGO_TEMPLATE),
            ("name", NAME_TEMPLATE),
            ("industry", INDUSTRY_TEMPLATE),
            ("info_window", INFO_WINDOW_TEMPLATE),
        ] {
            handlebars
                .register_template_string(name, template)
                .map_err(anyhow::Error::from)?;
        }
        Ok(Self { handlebars })
    }

    /// Link to the `kind` listing filtered on one industry
    pub fn industry_link(
        &self,
        industry: &str,
        kind: ListingKind,
        status: CompanyStatus,
    ) -> Result<String> {
        let href = industry_href(industry, kind, status);
        Ok(self
            .handlebars
            .render("industry", &json!({ "href": href, "name": industry }))?)
    }

    fn industry_links<'a, I>(
        &self,
        industries: I,
        kind: ListingKind,
        status: CompanyStatus,
    ) -> Result<String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let links = industries
            .into_iter()
            .map(|name| self.industry_link(name, kind, status))
            .collect::<Result<Vec<_>>>()?;
        Ok(links.join(" "))
    }

    /// Row summary of one partner for the list view
    pub fn list_row(&self, partner: &Partner, status: CompanyStatus) -> Result<ListRow> {
        Ok(ListRow {
            logo: self
                .handlebars
                .render("logo", &json!({ "src": partner.small_image_url() }))?,
            name: self.handlebars.render(
                "name",
                &json!({ "url": partner.url(), "name": partner.name }),
            )?,
            email: partner.email.clone().unwrap_or_default(),
            industries: self.industry_links(partner.industry_names(), ListingKind::List, status)?,
            city: partner.city.clone(),
            state_name: partner.state_name().map(str::to_string),
            country_name: partner.country_name().map(str::to_string),
        })
    }

    /// JSON array of row summaries, in the order of `partners`
    pub fn list_payload(&self, partners: &[Partner], status: CompanyStatus) -> Result<String> {
        let rows = partners
            .iter()
            .map(|partner| self.list_row(partner, status))
            .collect::<Result<Vec<_>>>()?;
        Ok(serde_json::to_string(&rows)?)
    }

    /// Info window shown when a map marker is clicked
    pub fn info_window(
        &self,
        id: PartnerId,
        name: &str,
        industries: &[&str],
        status: CompanyStatus,
        location: &[Option<&str>],
    ) -> Result<String> {
        let location = location
            .iter()
            .flatten()
            .filter(|part| !part.is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join(", ");
        let industries =
            self.industry_links(industries.iter().copied(), ListingKind::Map, status)?;

        Ok(self.handlebars.render(
            "info_window",
            &json!({
                "url": company_url(id, name),
                "name": name,
                "location": location,
                "industries": industries,
            }),
        )?)
    }

    /// Markers for the geo join rows, keyed by partner id
    ///
    /// Rows are grouped by partner with industries kept in row order.
    /// Partners without both coordinates are left out.
    pub fn map_markers(
        &self,
        rows: &[MapRow],
        status: CompanyStatus,
    ) -> Result<BTreeMap<PartnerId, MapMarker>> {
        let mut grouped: IndexMap<PartnerId, (&MapRow, Vec<&str>)> = IndexMap::new();
        for row in rows {
            grouped
                .entry(row.id)
                .or_insert_with(|| (row, Vec::new()))
                .1
                .push(row.industry_name.as_str());
        }

        let mut markers = BTreeMap::new();
        for (id, (row, industries)) in grouped {
            let (Some(latitude), Some(longitude)) = (row.latitude, row.longitude) else {
                debug!("Partner {} has no coordinates, skipped from map", id);
                continue;
            };
            let html = self.info_window(
                id,
                &row.name,
                &industries,
                status,
                &[
                    row.city.as_deref(),
                    Some(row.state_name.as_str()),
                    Some(row.country_name.as_str()),
                ],
            )?;
            markers.insert(id, (latitude, longitude, html));
        }
        Ok(markers)
    }

    /// JSON object `{ "<id>": [lat, lon, html] }`
    pub fn map_payload(&self, rows: &[MapRow], status: CompanyStatus) -> Result<String> {
        let markers = self.map_markers(rows, status)?;
        Ok(serde_json::to_string(&markers)?)
    }
}

/// Target of an industry tag: the listing filtered on that industry
pub fn industry_href(industry: &str, kind: ListingKind, status: CompanyStatus) -> String {
    format!(
        "{}?search={}&company_status={}",
        kind.url(),
        urlencoding::encode(industry),
        status
    )
}
