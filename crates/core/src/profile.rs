//! Company profile form handling
//!
//! The create and edit pages post a flat list of form fields. Only the
//! fields listed in [`PartnerForm`] are recognised; any other key is
//! ignored. Industries are posted as one field per selected industry, each
//! key containing `industry_ids` (for example `industry_ids` repeated, or
//! `industry_ids_3`), and replace the whole industry set when present.
//! A recognised field posted empty clears the stored value, except `name`.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::debug;

use crate::models::{Calls, Partner, SocialNetworks};
use crate::{Result, StudiomapError};

/// Optional text fields of a company, as posted
const CLEARABLE_FIELDS: &[&str] = &[
    "email", "website", "street", "street2", "city", "zip", "phone", "mobile", "fax",
    "linkedin", "vimeo", "youtube", "twitter", "facebook", "country_id",
];

/// What to do with the company logo
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ImageChange {
    /// Leave the current image untouched
    #[default]
    Keep,
    /// Drop the current image
    Remove,
    /// Replace with a new base64 encoded image
    Replace(String),
}

/// Cleaned values of a submitted company profile form
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PartnerForm {
    pub name: Option<String>,
    pub email: Option<String>,
    pub website: Option<String>,
    pub street: Option<String>,
    pub street2: Option<String>,
    pub city: Option<String>,
    pub zip: Option<String>,
    pub country_id: Option<i64>,
    pub calls: Calls,
    pub social_networks: SocialNetworks,
    pub image: ImageChange,
    /// `Some` replaces the full industry set
    pub industry_ids: Option<Vec<i64>>,
    /// Fields posted empty, reset to NULL on save
    #[serde(default)]
    pub cleared: BTreeSet<String>,
}

impl PartnerForm {
    /// Clean the raw fields of a post request
    ///
    /// `image_file` is the content of the uploaded logo, if any. It is
    /// ignored when `remove_image` is set.
    ///
    /// # Errors
    ///
    /// Returns a validation error when `country_id` or an industry id is
    /// not an integer.
    ///
    /// # Examples
    ///
    /// ```
    /// use studiomap_core::profile::{ImageChange, PartnerForm};
    ///
    /// let fields = vec![
    ///     ("name".to_string(), "Blue Fox".to_string()),
    ///     ("country_id".to_string(), "75".to_string()),
    ///     ("industry_ids".to_string(), "2".to_string()),
    ///     ("industry_ids".to_string(), "5".to_string()),
    ///     ("csrf_token".to_string(), "abc".to_string()),
    /// ];
    /// let form = PartnerForm::from_post(fields, None).unwrap();
    /// assert_eq!(form.name.as_deref(), Some("Blue Fox"));
    /// assert_eq!(form.country_id, Some(75));
    /// assert_eq!(form.industry_ids, Some(vec![2, 5]));
    /// assert_eq!(form.image, ImageChange::Keep);
    /// ```
    pub fn from_post<I>(fields: I, image_file: Option<&[u8]>) -> Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut form = Self::default();
        let mut remove_image = false;
        let mut industry_ids = Vec::new();

        for (key, value) in fields {
            if key.contains("industry_ids") {
                if value.trim().is_empty() {
                    continue;
                }
                industry_ids.push(parse_id(&key, &value)?);
                continue;
            }

            let text = non_empty(value);
            if text.is_none() && CLEARABLE_FIELDS.contains(&key.as_str()) {
                form.cleared.insert(key.clone());
            }
            match key.as_str() {
                "name" => form.name = text,
                "email" => form.email = text,
                "website" => form.website = text,
                "street" => form.street = text,
                "street2" => form.street2 = text,
                "city" => form.city = text,
                "zip" => form.zip = text,
                "phone" => form.calls.phone = text,
                "mobile" => form.calls.mobile = text,
                "fax" => form.calls.fax = text,
                "linkedin" => form.social_networks.linkedin = text,
                "vimeo" => form.social_networks.vimeo = text,
                "youtube" => form.social_networks.youtube = text,
                "twitter" => form.social_networks.twitter = text,
                "facebook" => form.social_networks.facebook = text,
                "country_id" => {
                    form.country_id = text.map(|v| parse_id(&key, &v)).transpose()?;
                }
                "remove_image" => remove_image = text.as_deref().is_some_and(is_truthy),
                _ => debug!(field = %key, "ignoring unrecognised form field"),
            }
        }

        form.image = match image_file {
            _ if remove_image => ImageChange::Remove,
            Some(bytes) if !bytes.is_empty() => ImageChange::Replace(STANDARD.encode(bytes)),
            _ => ImageChange::Keep,
        };

        if !industry_ids.is_empty() {
            form.industry_ids = Some(industry_ids);
        }

        Ok(form)
    }

    /// Whether `field` was posted empty
    pub fn clears(&self, field: &str) -> bool {
        self.cleared.contains(field)
    }

    /// Optional text fields with their column names, in form order
    pub fn text_fields(&self) -> [(&'static str, &Option<String>); 14] {
        [
            ("email", &self.email),
            ("website", &self.website),
            ("street", &self.street),
            ("street2", &self.street2),
            ("city", &self.city),
            ("zip", &self.zip),
            ("phone", &self.calls.phone),
            ("mobile", &self.calls.mobile),
            ("fax", &self.calls.fax),
            ("linkedin", &self.social_networks.linkedin),
            ("vimeo", &self.social_networks.vimeo),
            ("youtube", &self.social_networks.youtube),
            ("twitter", &self.social_networks.twitter),
            ("facebook", &self.social_networks.facebook),
        ]
    }

    /// Copy the scalar fields posted in the form onto `partner`
    ///
    /// Fields absent from the form are left alone, fields posted empty are
    /// cleared. Relations (`country_id`, `industry_ids`) need a store
    /// lookup and are resolved by the caller.
    pub fn apply_scalars(&self, partner: &mut Partner) {
        if let Some(name) = &self.name {
            partner.name.clone_from(name);
        }

        let targets: [&mut Option<String>; 14] = [
            &mut partner.email,
            &mut partner.website,
            &mut partner.street,
            &mut partner.street2,
            &mut partner.city,
            &mut partner.zip,
            &mut partner.calls.phone,
            &mut partner.calls.mobile,
            &mut partner.calls.fax,
            &mut partner.social_networks.linkedin,
            &mut partner.social_networks.vimeo,
            &mut partner.social_networks.youtube,
            &mut partner.social_networks.twitter,
            &mut partner.social_networks.facebook,
        ];
        for (target, (field, value)) in targets.into_iter().zip(self.text_fields()) {
            if value.is_some() {
                target.clone_from(value);
            } else if self.clears(field) {
                *target = None;
            }
        }

        match &self.image {
            ImageChange::Keep => {}
            ImageChange::Remove => partner.image = None,
            ImageChange::Replace(encoded) => partner.image = Some(encoded.clone()),
        }
    }

    /// Name required to create a company
    pub fn require_name(&self) -> Result<&str> {
        self.name
            .as_deref()
            .ok_or_else(|| StudiomapError::validation("Company name is required"))
    }
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else if trimmed.len() == value.len() {
        Some(value)
    } else {
        Some(trimmed.to_string())
    }
}

fn parse_id(key: &str, value: &str) -> Result<i64> {
    value.trim().parse().map_err(|_| {
        StudiomapError::validation(format!("Field '{}' expects an id, got '{}'", key, value))
    })
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.to_lowercase().as_str(),
        "1" | "true" | "on" | "yes"
    )
}
