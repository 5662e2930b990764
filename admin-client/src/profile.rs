use std::sync::Arc;

use chrono::{DateTime, Utc};
use common_auth::{AuthError, AuthResult, Principal, Role};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use tracing::info;

use crate::backend::ApiClient;
use crate::session::SessionStore;
use crate::verifier::principal_from_body;

const MISSING: &str = "NA";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneralInfo {
    #[serde(alias = "_id")]
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    #[serde(default, deserialize_with = "text")]
    pub tenant_id: Option<String>,
    #[serde(default, deserialize_with = "timestamp")]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ContactInfo {
    #[serde(default, deserialize_with = "text")]
    pub phone: Option<String>,
    #[serde(default, deserialize_with = "text")]
    pub address: Option<String>,
    #[serde(default, deserialize_with = "text")]
    pub gender: Option<String>,
    #[serde(default, deserialize_with = "text")]
    pub dob: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessDetails {
    #[serde(default, deserialize_with = "text")]
    pub gst_number: Option<String>,
    #[serde(default, deserialize_with = "text")]
    pub registration_number: Option<String>,
    #[serde(default, deserialize_with = "text")]
    pub business_type: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    #[serde(default, deserialize_with = "text")]
    pub address: Option<String>,
    #[serde(default, deserialize_with = "text")]
    pub city: Option<String>,
    #[serde(default, deserialize_with = "text")]
    pub state: Option<String>,
    #[serde(default, deserialize_with = "text")]
    pub zip_code: Option<String>,
    #[serde(default, deserialize_with = "text")]
    pub country: Option<String>,
}

/// The gym (tenant) an owner runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessInfo {
    #[serde(default, deserialize_with = "text")]
    pub domain: Option<String>,
    #[serde(default, deserialize_with = "text")]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "text")]
    pub subscription_type: Option<String>,
    #[serde(default, deserialize_with = "text")]
    pub contact_email: Option<String>,
    #[serde(default, deserialize_with = "text")]
    pub contact_phone: Option<String>,
    #[serde(default, deserialize_with = "text")]
    pub billing_address: Option<String>,
    #[serde(default)]
    pub business_details: BusinessDetails,
    #[serde(default)]
    pub location: Location,
}

/// Trainer reference on a membership: either a bare id or a populated record.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum TrainerRef {
    Id(String),
    Populated {
        #[serde(alias = "_id")]
        id: String,
        #[serde(default)]
        name: Option<String>,
    },
}

impl TrainerRef {
    pub fn label(&self) -> &str {
        match self {
            TrainerRef::Id(id) => id,
            TrainerRef::Populated { name: Some(name), .. } => name,
            TrainerRef::Populated { id, .. } => id,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MembershipInfo {
    #[serde(default, deserialize_with = "text")]
    pub plan_type: Option<String>,
    #[serde(default)]
    pub assigned_trainer: Option<TrainerRef>,
    #[serde(default, deserialize_with = "timestamp")]
    pub join_date: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "timestamp")]
    pub membership_end_date: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "text")]
    pub profile_image: Option<String>,
    #[serde(default, deserialize_with = "text")]
    pub image: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TrainerInfo {
    #[serde(default, deserialize_with = "text")]
    pub specialization: Option<String>,
    #[serde(default, deserialize_with = "text")]
    pub branch: Option<String>,
}

/// Profile data, shaped by role: each variant carries exactly the sections
/// that role shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Profile {
    SuperAdmin { general: GeneralInfo },
    Owner { general: GeneralInfo, business: BusinessInfo },
    Manager { general: GeneralInfo, contact: ContactInfo },
    Frontdesk { general: GeneralInfo, contact: ContactInfo },
    Trainer { general: GeneralInfo, contact: ContactInfo, trainer: TrainerInfo },
    Member { general: GeneralInfo, contact: ContactInfo, membership: MembershipInfo },
    Other { general: GeneralInfo },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileSection {
    General,
    Contact,
    Business,
    Membership,
    Trainer,
}

impl ProfileSection {
    pub fn title(&self) -> &'static str {
        match self {
            ProfileSection::General => "General Info",
            ProfileSection::Contact => "Contact Info",
            ProfileSection::Business => "Business Info (Tenant)",
            ProfileSection::Membership => "Member Info",
            ProfileSection::Trainer => "Trainer Info",
        }
    }
}

impl Profile {
    /// Build from a `/auth/me` body: the user object (bare or under `user`)
    /// plus optional `tenant` and `member` objects.
    pub fn from_me_payload(body: Value) -> AuthResult<Self> {
        let Value::Object(mut root) = body else {
            return Err(AuthError::InvalidResponse);
        };
        let mut user = match root.remove("user") {
            Some(Value::Object(user)) => user,
            Some(_) | None => std::mem::take(&mut root),
        };
        let tenant = take_object(&mut root, "tenant").or_else(|| take_object(&mut user, "tenant"));
        let member = take_object(&mut root, "member").or_else(|| take_object(&mut user, "member"));

        let user = Value::Object(user);
        let general: GeneralInfo = serde_json::from_value(user.clone())?;
        let contact = || serde_json::from_value::<ContactInfo>(user.clone());

        let profile = match general.role {
            Role::SuperAdmin => Profile::SuperAdmin { general },
            Role::Owner => Profile::Owner {
                general,
                business: section_from(tenant)?,
            },
            Role::Manager => Profile::Manager { general, contact: contact()? },
            Role::Frontdesk => Profile::Frontdesk { general, contact: contact()? },
            Role::Trainer => Profile::Trainer {
                general,
                contact: contact()?,
                trainer: serde_json::from_value(user.clone())?,
            },
            Role::Member => Profile::Member {
                general,
                contact: contact()?,
                membership: section_from(member)?,
            },
            Role::Unknown(_) => Profile::Other { general },
        };
        Ok(profile)
    }

    pub fn general(&self) -> &GeneralInfo {
        match self {
            Profile::SuperAdmin { general }
            | Profile::Owner { general, .. }
            | Profile::Manager { general, .. }
            | Profile::Frontdesk { general, .. }
            | Profile::Trainer { general, .. }
            | Profile::Member { general, .. }
            | Profile::Other { general } => general,
        }
    }

    pub fn role(&self) -> &Role {
        &self.general().role
    }

    pub fn sections(&self) -> Vec<ProfileSection> {
        use ProfileSection::*;
        match self {
            Profile::SuperAdmin { .. } | Profile::Other { .. } => vec![General],
            Profile::Owner { .. } => vec![General, Business],
            Profile::Manager { .. } | Profile::Frontdesk { .. } => vec![General, Contact],
            Profile::Trainer { .. } => vec![General, Contact, Trainer],
            Profile::Member { .. } => vec![General, Contact, Membership],
        }
    }

    /// Label/value rows for one visible section; absent values read "NA".
    /// Sections the role does not carry yield no rows.
    pub fn fields(&self, section: ProfileSection) -> Vec<(&'static str, String)> {
        let show = |value: Option<&str>| value.unwrap_or(MISSING).to_string();
        let date = |value: &Option<DateTime<Utc>>| {
            value
                .map(|at| at.format("%Y-%m-%d").to_string())
                .unwrap_or_else(|| MISSING.to_string())
        };

        match (section, self) {
            (ProfileSection::General, profile) => {
                let general = profile.general();
                vec![
                    ("name", general.name.clone()),
                    ("email", general.email.clone()),
                    ("role", general.role.to_string()),
                    ("tenantId", show(general.tenant_id.as_deref())),
                    ("createdAt", date(&general.created_at)),
                ]
            }
            (
                ProfileSection::Contact,
                Profile::Manager { contact, .. }
                | Profile::Frontdesk { contact, .. }
                | Profile::Trainer { contact, .. }
                | Profile::Member { contact, .. },
            ) => vec![
                ("phone", show(contact.phone.as_deref())),
                ("address", show(contact.address.as_deref())),
                ("gender", show(contact.gender.as_deref())),
                ("dob", show(contact.dob.as_deref())),
            ],
            (ProfileSection::Business, Profile::Owner { business, .. }) => vec![
                ("domain", show(business.domain.as_deref())),
                ("status", show(business.status.as_deref())),
                ("subscriptionType", show(business.subscription_type.as_deref())),
                ("contactEmail", show(business.contact_email.as_deref())),
                ("contactPhone", show(business.contact_phone.as_deref())),
                ("billingAddress", show(business.billing_address.as_deref())),
                ("gstNumber", show(business.business_details.gst_number.as_deref())),
                (
                    "registrationNumber",
                    show(business.business_details.registration_number.as_deref()),
                ),
                ("businessType", show(business.business_details.business_type.as_deref())),
                ("city", show(business.location.city.as_deref())),
                ("state", show(business.location.state.as_deref())),
                ("zipCode", show(business.location.zip_code.as_deref())),
                ("country", show(business.location.country.as_deref())),
            ],
            (ProfileSection::Membership, Profile::Member { membership, .. }) => vec![
                ("planType", show(membership.plan_type.as_deref())),
                (
                    "assignedTrainer",
                    show(membership.assigned_trainer.as_ref().map(TrainerRef::label)),
                ),
                ("joinDate", date(&membership.join_date)),
                ("membershipEndDate", date(&membership.membership_end_date)),
                (
                    "profileImage",
                    show(membership.profile_image.as_deref().or(membership.image.as_deref())),
                ),
            ],
            (ProfileSection::Trainer, Profile::Trainer { trainer, .. }) => vec![
                ("specialization", show(trainer.specialization.as_deref())),
                ("branch", show(trainer.branch.as_deref())),
            ],
            _ => Vec::new(),
        }
    }
}

/// Editable fields of the signed-in user's own profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dob: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub specialization: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
}

impl ProfileUpdate {
    pub fn validate(&self) -> AuthResult<()> {
        if *self == ProfileUpdate::default() {
            return Err(AuthError::Validation("Nothing to update".into()));
        }
        if self.name.as_deref().is_some_and(|name| name.trim().is_empty()) {
            return Err(AuthError::MissingField("name"));
        }
        if self.email.as_deref().is_some_and(|email| email.trim().is_empty()) {
            return Err(AuthError::MissingField("email"));
        }
        Ok(())
    }

    fn apply_to(&self, principal: &Principal) -> Principal {
        let mut updated = principal.clone();
        if let Some(name) = &self.name {
            updated.name = name.trim().to_string();
        }
        if let Some(email) = &self.email {
            updated.email = email.trim().to_string();
        }
        updated
    }
}

/// Loads and edits the signed-in user's own profile.
pub struct ProfileService {
    store: Arc<SessionStore>,
    api: ApiClient,
}

impl ProfileService {
    pub fn new(store: Arc<SessionStore>, api: ApiClient) -> Self {
        Self { store, api }
    }

    pub async fn load(&self) -> AuthResult<Profile> {
        let snapshot = self.store.snapshot();
        let credential = match (&snapshot.session.credential, snapshot.principal()) {
            (Some(credential), Some(_)) => credential,
            _ => return Err(AuthError::Unauthenticated),
        };
        let body = self.api.get("/auth/me", Some(credential)).await?;
        Profile::from_me_payload(body)
    }

    /// Save `changes` and refresh the session principal from the result.
    pub async fn update(&self, changes: &ProfileUpdate) -> AuthResult<Principal> {
        changes.validate()?;

        let snapshot = self.store.snapshot();
        let (credential, current) = match (&snapshot.session.credential, snapshot.principal()) {
            (Some(credential), Some(principal)) => (credential, principal),
            _ => return Err(AuthError::Unauthenticated),
        };

        let body = serde_json::to_value(changes)?;
        let response = self.api.put("/auth/update/me", Some(credential), &body).await?;

        let refreshed = match principal_from_body(response) {
            Ok(principal) if principal.id == current.id => principal,
            _ => changes.apply_to(current),
        };

        if !self
            .store
            .update_principal_if_current(snapshot.generation, refreshed.clone())?
        {
            return Err(AuthError::Superseded);
        }
        info!(principal_id = %refreshed.id, "profile updated");
        Ok(refreshed)
    }
}

fn take_object(map: &mut Map<String, Value>, key: &str) -> Option<Map<String, Value>> {
    match map.remove(key) {
        Some(Value::Object(object)) => Some(object),
        Some(other) => {
            map.insert(key.to_string(), other);
            None
        }
        None => None,
    }
}

fn section_from<T>(object: Option<Map<String, Value>>) -> AuthResult<T>
where
    T: for<'de> Deserialize<'de> + Default,
{
    match object {
        Some(object) => Ok(serde_json::from_value(Value::Object(object))?),
        None => Ok(T::default()),
    }
}

/// Accept any scalar as text; nested objects are kept as compact JSON.
fn text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => None,
        Some(Value::String(value)) if value.trim().is_empty() => None,
        Some(Value::String(value)) => Some(value),
        Some(other) => Some(other.to_string()),
    })
}

/// RFC 3339 timestamps; anything unparseable is treated as absent.
fn timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = text(deserializer)?;
    Ok(raw.and_then(|value| {
        DateTime::parse_from_rfc3339(&value)
            .ok()
            .map(|at| at.with_timezone(&Utc))
    }))
}
