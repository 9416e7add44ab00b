//! Create and edit forms for land, equipment and produce listings.
//!
//! Each form posts back to itself. Invalid input re-renders the form with
//! what was typed and a list of problems; a successful save redirects to
//! the owner's dashboard with a notice.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use farmshare_core::{EquipmentId, LandListingId, ListingKind, Money, ProduceId};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::{Page, RequireUser};
use crate::models::{CurrentUser, Flash};
use crate::routes::params::{AmenityChecks, SelectOption, checkbox, fixed_options};
use crate::services::listings::{ensure_can_create, ensure_owner};
use crate::services::ListingService;
use crate::state::AppState;
use crate::supabase::{
    AccessToken, EquipmentFields, EquipmentListing, LandListing, LandListingFields,
    ProduceFields, ProduceListing, WATER_ACCESS,
};

const EQUIPMENT_CATEGORIES: &[(&str, &str)] = &[
    ("heavy machinery", "Heavy machinery"),
    ("irrigation", "Irrigation"),
    ("tools", "Tools"),
];

const EQUIPMENT_CONDITIONS: &[(&str, &str)] =
    &[("excellent", "Excellent"), ("good", "Good"), ("fair", "Fair")];

const PRODUCE_CATEGORIES: &[(&str, &str)] = &[
    ("vegetables", "Vegetables"),
    ("fruits", "Fruits"),
    ("grains", "Grains"),
    ("dairy", "Dairy"),
];

const PRODUCE_UNITS: &[(&str, &str)] =
    &[("kg", "per kg"), ("liter", "per liter"), ("dozen", "per dozen")];

// =============================================================================
// Validation
// =============================================================================

/// Collects every problem with a submitted form.
#[derive(Debug, Default)]
struct Checker {
    problems: Vec<String>,
}

/// Upper bound on any listed price.
const MAX_PRICE_RUPEES: i64 = 10_000_000;

impl Checker {
    fn required(&mut self, label: &str, raw: &str) -> String {
        let value = raw.trim();
        if value.is_empty() {
            self.problems.push(format!("{label} is required"));
        }
        value.to_string()
    }

    fn choice(&mut self, label: &str, raw: &str, choices: &[(&str, &str)]) -> String {
        let value = raw.trim();
        if !choices.iter().any(|(v, _)| *v == value) {
            self.problems.push(format!("Please choose a {}", label.to_lowercase()));
        }
        value.to_string()
    }

    fn positive_whole(&mut self, label: &str, raw: &str) -> u32 {
        match raw.trim().parse::<u32>() {
            Ok(n) if n > 0 => n,
            _ => {
                self.problems
                    .push(format!("{label} must be a whole number above zero"));
                0
            }
        }
    }

    fn positive_money(&mut self, label: &str, raw: &str) -> Money {
        let max = Money::from_rupees(MAX_PRICE_RUPEES);
        match Money::parse(raw) {
            Ok(amount) if amount > max => {
                self.problems
                    .push(format!("{label} must be at most {}", max.display()));
                Money::ZERO
            }
            Ok(amount) if !amount.is_zero() => amount,
            _ => {
                self.problems.push(format!("{label} must be more than zero"));
                Money::ZERO
            }
        }
    }

    fn finish<T>(self, value: T) -> std::result::Result<T, Vec<String>> {
        if self.problems.is_empty() {
            Ok(value)
        } else {
            Err(self.problems)
        }
    }
}

fn optional(raw: &str) -> Option<String> {
    let value = raw.trim();
    (!value.is_empty()).then(|| value.to_string())
}

// =============================================================================
// Form Types
// =============================================================================

/// Land listing form, as typed.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LandForm {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub total_area_sqft: String,
    #[serde(default)]
    pub price_per_sqft_monthly: String,
    #[serde(default)]
    pub soil_type: String,
    #[serde(default)]
    pub description: String,
    #[serde(flatten)]
    pub amenities: AmenityChecks,
}

impl LandForm {
    fn validate(&self) -> std::result::Result<LandListingFields, Vec<String>> {
        let mut check = Checker::default();
        let fields = LandListingFields {
            title: check.required("Title", &self.title),
            location: check.required("Location", &self.location),
            total_area_sqft: check.positive_whole("Total area", &self.total_area_sqft),
            price_per_sqft_monthly: check
                .positive_money("Monthly price per sq ft", &self.price_per_sqft_monthly),
            soil_type: optional(&self.soil_type),
            description: optional(&self.description),
            water_access: self.amenities.water_access,
            amenities: self
                .amenities
                .labels()
                .into_iter()
                .filter(|label| label != WATER_ACCESS)
                .collect(),
        };
        check.finish(fields)
    }
}

impl From<&LandListing> for LandForm {
    fn from(plot: &LandListing) -> Self {
        Self {
            title: plot.title.clone(),
            location: plot.location.clone(),
            total_area_sqft: plot.total_area_sqft.to_string(),
            price_per_sqft_monthly: plot.price_per_sqft_monthly.amount().to_string(),
            soil_type: plot.soil_type.clone().unwrap_or_default(),
            description: plot.description.clone().unwrap_or_default(),
            amenities: AmenityChecks::from_stored(
                plot.water_access.unwrap_or(false),
                plot.amenities.as_deref().unwrap_or_default(),
            ),
        }
    }
}

/// Equipment listing form, as typed.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EquipmentForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub price_per_day: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub condition: String,
    #[serde(default)]
    pub description: String,
}

impl EquipmentForm {
    fn validate(&self) -> std::result::Result<EquipmentFields, Vec<String>> {
        let mut check = Checker::default();
        let condition = optional(&self.condition)
            .map(|c| check.choice("Condition", &c, EQUIPMENT_CONDITIONS));
        let fields = EquipmentFields {
            name: check.required("Name", &self.name),
            category: check.choice("Category", &self.category, EQUIPMENT_CATEGORIES),
            price_per_day: check.positive_money("Price per day", &self.price_per_day),
            location: optional(&self.location),
            condition,
            description: optional(&self.description),
        };
        check.finish(fields)
    }
}

impl From<&EquipmentListing> for EquipmentForm {
    fn from(item: &EquipmentListing) -> Self {
        Self {
            name: item.name.clone(),
            category: item.category.clone(),
            price_per_day: item.price_per_day.amount().to_string(),
            location: item.location.clone().unwrap_or_default(),
            condition: item.condition.clone().unwrap_or_default(),
            description: item.description.clone().unwrap_or_default(),
        }
    }
}

/// Produce listing form, as typed.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProduceForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub price_per_unit: String,
    #[serde(default)]
    pub unit: String,
    #[serde(default)]
    pub quantity_available: String,
    #[serde(default, deserialize_with = "checkbox")]
    pub organic: bool,
    #[serde(default)]
    pub description: String,
}

impl ProduceForm {
    fn validate(&self) -> std::result::Result<ProduceFields, Vec<String>> {
        let mut check = Checker::default();
        let fields = ProduceFields {
            name: check.required("Name", &self.name),
            category: check.choice("Category", &self.category, PRODUCE_CATEGORIES),
            price_per_unit: check.positive_money("Price", &self.price_per_unit),
            unit: check.choice("Unit", &self.unit, PRODUCE_UNITS),
            quantity_available: check.positive_whole("Quantity", &self.quantity_available),
            organic: self.organic,
            description: optional(&self.description),
        };
        check.finish(fields)
    }
}

impl From<&ProduceListing> for ProduceForm {
    fn from(item: &ProduceListing) -> Self {
        Self {
            name: item.name.clone(),
            category: item.category.clone(),
            price_per_unit: item.price_per_unit.amount().to_string(),
            unit: item.unit.clone(),
            quantity_available: item.quantity_available.to_string(),
            organic: item.organic.unwrap_or(false),
            description: item.description.clone().unwrap_or_default(),
        }
    }
}

// =============================================================================
// Templates
// =============================================================================

/// Shared form chrome: where it posts and what went wrong.
#[derive(Debug, Clone)]
pub struct FormMeta {
    pub heading: &'static str,
    pub action: String,
    pub submit: &'static str,
    pub errors: Vec<String>,
}

impl FormMeta {
    fn create(heading: &'static str, action: &str) -> Self {
        Self {
            heading,
            action: action.to_string(),
            submit: "Create listing",
            errors: Vec::new(),
        }
    }

    fn edit(heading: &'static str, action: String) -> Self {
        Self {
            heading,
            action,
            submit: "Save changes",
            errors: Vec::new(),
        }
    }

    fn with_errors(mut self, errors: Vec<String>) -> Self {
        self.errors = errors;
        self
    }
}

#[derive(Template, WebTemplate)]
#[template(path = "listings/land_form.html")]
pub struct LandFormTemplate {
    pub page: Page,
    pub meta: FormMeta,
    pub form: LandForm,
}

#[derive(Template, WebTemplate)]
#[template(path = "listings/equipment_form.html")]
pub struct EquipmentFormTemplate {
    pub page: Page,
    pub meta: FormMeta,
    pub form: EquipmentForm,
    pub categories: Vec<SelectOption>,
    pub conditions: Vec<SelectOption>,
}

impl EquipmentFormTemplate {
    fn new(page: Page, meta: FormMeta, form: EquipmentForm) -> Self {
        Self {
            categories: fixed_options(EQUIPMENT_CATEGORIES, &form.category),
            conditions: fixed_options(EQUIPMENT_CONDITIONS, &form.condition),
            page,
            meta,
            form,
        }
    }
}

#[derive(Template, WebTemplate)]
#[template(path = "listings/produce_form.html")]
pub struct ProduceFormTemplate {
    pub page: Page,
    pub meta: FormMeta,
    pub form: ProduceForm,
    pub categories: Vec<SelectOption>,
    pub units: Vec<SelectOption>,
}

impl ProduceFormTemplate {
    fn new(page: Page, meta: FormMeta, form: ProduceForm) -> Self {
        Self {
            categories: fixed_options(PRODUCE_CATEGORIES, &form.category),
            units: fixed_options(PRODUCE_UNITS, &form.unit),
            page,
            meta,
            form,
        }
    }
}

fn invalid(template: impl IntoResponse) -> Response {
    (StatusCode::UNPROCESSABLE_ENTITY, template).into_response()
}

async fn saved(session: &Session, user: &CurrentUser, message: String) -> Response {
    Flash::success("Listing saved", message).store(session).await;
    Redirect::to(user.role.dashboard_path()).into_response()
}

fn not_found(what: &str, id: &str) -> AppError {
    AppError::NotFound(format!("{what} {id}"))
}

// =============================================================================
// Land
// =============================================================================

const LAND_NEW: &str = "List your land";
const LAND_EDIT: &str = "Edit plot";

pub async fn new_land(RequireUser(user): RequireUser, page: Page) -> Result<Response> {
    ensure_can_create(&user, ListingKind::Land)?;
    Ok(LandFormTemplate {
        page,
        meta: FormMeta::create(LAND_NEW, "/listings/land"),
        form: LandForm::default(),
    }
    .into_response())
}

#[instrument(skip(state, session, user, page, form), fields(user_id = %user.id))]
pub async fn create_land(
    State(state): State<AppState>,
    session: Session,
    RequireUser(user): RequireUser,
    page: Page,
    Form(form): Form<LandForm>,
) -> Result<Response> {
    ensure_can_create(&user, ListingKind::Land)?;
    let fields = match form.validate() {
        Ok(fields) => fields,
        Err(errors) => {
            return Ok(invalid(LandFormTemplate {
                page,
                meta: FormMeta::create(LAND_NEW, "/listings/land").with_errors(errors),
                form,
            }));
        }
    };

    let plot = ListingService::new(state.backend())
        .create_land(&user, fields)
        .await?;
    Ok(saved(&session, &user, format!("{} is now listed", plot.title)).await)
}

#[instrument(skip(state, user, page), fields(user_id = %user.id))]
pub async fn edit_land(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    page: Page,
    Path(id): Path<String>,
) -> Result<Response> {
    let plot_id = LandListingId::parse(&id).map_err(|_| not_found("plot", &id))?;
    let plot = ListingService::new(state.backend())
        .plot(plot_id, AccessToken::User(&user.access_token))
        .await?;
    ensure_owner(&user, plot.farmer_id)?;

    Ok(LandFormTemplate {
        page,
        meta: FormMeta::edit(LAND_EDIT, format!("/listings/land/{id}")),
        form: LandForm::from(&plot),
    }
    .into_response())
}

#[instrument(skip(state, session, user, page, form), fields(user_id = %user.id))]
pub async fn update_land(
    State(state): State<AppState>,
    session: Session,
    RequireUser(user): RequireUser,
    page: Page,
    Path(id): Path<String>,
    Form(form): Form<LandForm>,
) -> Result<Response> {
    let plot_id = LandListingId::parse(&id).map_err(|_| not_found("plot", &id))?;
    let fields = match form.validate() {
        Ok(fields) => fields,
        Err(errors) => {
            return Ok(invalid(LandFormTemplate {
                page,
                meta: FormMeta::edit(LAND_EDIT, format!("/listings/land/{id}")).with_errors(errors),
                form,
            }));
        }
    };

    let title = fields.title.clone();
    ListingService::new(state.backend())
        .update_land(&user, plot_id, fields)
        .await?;
    Ok(saved(&session, &user, format!("{title} was updated")).await)
}

// =============================================================================
// Equipment
// =============================================================================

const EQUIPMENT_NEW: &str = "List equipment";
const EQUIPMENT_EDIT: &str = "Edit equipment";

pub async fn new_equipment(RequireUser(user): RequireUser, page: Page) -> Result<Response> {
    ensure_can_create(&user, ListingKind::Equipment)?;
    Ok(EquipmentFormTemplate::new(
        page,
        FormMeta::create(EQUIPMENT_NEW, "/listings/equipment"),
        EquipmentForm::default(),
    )
    .into_response())
}

#[instrument(skip(state, session, user, page, form), fields(user_id = %user.id))]
pub async fn create_equipment(
    State(state): State<AppState>,
    session: Session,
    RequireUser(user): RequireUser,
    page: Page,
    Form(form): Form<EquipmentForm>,
) -> Result<Response> {
    ensure_can_create(&user, ListingKind::Equipment)?;
    let fields = match form.validate() {
        Ok(fields) => fields,
        Err(errors) => {
            let meta = FormMeta::create(EQUIPMENT_NEW, "/listings/equipment").with_errors(errors);
            return Ok(invalid(EquipmentFormTemplate::new(page, meta, form)));
        }
    };

    let item = ListingService::new(state.backend())
        .create_equipment(&user, fields)
        .await?;
    Ok(saved(&session, &user, format!("{} is now listed", item.name)).await)
}

#[instrument(skip(state, user, page), fields(user_id = %user.id))]
pub async fn edit_equipment(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    page: Page,
    Path(id): Path<String>,
) -> Result<Response> {
    let item_id = EquipmentId::parse(&id).map_err(|_| not_found("equipment", &id))?;
    let item = ListingService::new(state.backend())
        .equipment_item(item_id, AccessToken::User(&user.access_token))
        .await?;
    ensure_owner(&user, item.vendor_id)?;

    Ok(EquipmentFormTemplate::new(
        page,
        FormMeta::edit(EQUIPMENT_EDIT, format!("/listings/equipment/{id}")),
        EquipmentForm::from(&item),
    )
    .into_response())
}

#[instrument(skip(state, session, user, page, form), fields(user_id = %user.id))]
pub async fn update_equipment(
    State(state): State<AppState>,
    session: Session,
    RequireUser(user): RequireUser,
    page: Page,
    Path(id): Path<String>,
    Form(form): Form<EquipmentForm>,
) -> Result<Response> {
    let item_id = EquipmentId::parse(&id).map_err(|_| not_found("equipment", &id))?;
    let fields = match form.validate() {
        Ok(fields) => fields,
        Err(errors) => {
            let meta = FormMeta::edit(EQUIPMENT_EDIT, format!("/listings/equipment/{id}"))
                .with_errors(errors);
            return Ok(invalid(EquipmentFormTemplate::new(page, meta, form)));
        }
    };

    let name = fields.name.clone();
    ListingService::new(state.backend())
        .update_equipment(&user, item_id, fields)
        .await?;
    Ok(saved(&session, &user, format!("{name} was updated")).await)
}

// =============================================================================
// Produce
// =============================================================================

const PRODUCE_NEW: &str = "Sell produce";
const PRODUCE_EDIT: &str = "Edit produce";

pub async fn new_produce(RequireUser(user): RequireUser, page: Page) -> Result<Response> {
    ensure_can_create(&user, ListingKind::Produce)?;
    Ok(ProduceFormTemplate::new(
        page,
        FormMeta::create(PRODUCE_NEW, "/listings/produce"),
        ProduceForm {
            unit: "kg".to_string(),
            ..ProduceForm::default()
        },
    )
    .into_response())
}

#[instrument(skip(state, session, user, page, form), fields(user_id = %user.id))]
pub async fn create_produce(
    State(state): State<AppState>,
    session: Session,
    RequireUser(user): RequireUser,
    page: Page,
    Form(form): Form<ProduceForm>,
) -> Result<Response> {
    ensure_can_create(&user, ListingKind::Produce)?;
    let fields = match form.validate() {
        Ok(fields) => fields,
        Err(errors) => {
            let meta = FormMeta::create(PRODUCE_NEW, "/listings/produce").with_errors(errors);
            return Ok(invalid(ProduceFormTemplate::new(page, meta, form)));
        }
    };

    let item = ListingService::new(state.backend())
        .create_produce(&user, fields)
        .await?;
    Ok(saved(&session, &user, format!("{} is now on the marketplace", item.name)).await)
}

#[instrument(skip(state, user, page), fields(user_id = %user.id))]
pub async fn edit_produce(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    page: Page,
    Path(id): Path<String>,
) -> Result<Response> {
    let item_id = ProduceId::parse(&id).map_err(|_| not_found("produce", &id))?;
    let item = ListingService::new(state.backend())
        .produce_item(item_id, AccessToken::User(&user.access_token))
        .await?;
    ensure_owner(&user, item.farmer_id)?;

    Ok(ProduceFormTemplate::new(
        page,
        FormMeta::edit(PRODUCE_EDIT, format!("/listings/produce/{id}")),
        ProduceForm::from(&item),
    )
    .into_response())
}

#[instrument(skip(state, session, user, page, form), fields(user_id = %user.id))]
pub async fn update_produce(
    State(state): State<AppState>,
    session: Session,
    RequireUser(user): RequireUser,
    page: Page,
    Path(id): Path<String>,
    Form(form): Form<ProduceForm>,
) -> Result<Response> {
    let item_id = ProduceId::parse(&id).map_err(|_| not_found("produce", &id))?;
    let fields = match form.validate() {
        Ok(fields) => fields,
        Err(errors) => {
            let meta = FormMeta::edit(PRODUCE_EDIT, format!("/listings/produce/{id}"))
                .with_errors(errors);
            return Ok(invalid(ProduceFormTemplate::new(page, meta, form)));
        }
    };

    let name = fields.name.clone();
    ListingService::new(state.backend())
        .update_produce(&user, item_id, fields)
        .await?;
    Ok(saved(&session, &user, format!("{name} was updated")).await)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_land_form_collects_every_problem() {
        let form = LandForm {
            total_area_sqft: "0".to_string(),
            price_per_sqft_monthly: "abc".to_string(),
            ..LandForm::default()
        };
        let errors = form.validate().unwrap_err();
        assert_eq!(
            errors,
            vec![
                "Title is required",
                "Location is required",
                "Total area must be a whole number above zero",
                "Monthly price per sq ft must be more than zero",
            ]
        );
    }

    #[test]
    fn test_land_form_splits_water_access_out() {
        let form = LandForm {
            title: " Sunny Garden Plot ".to_string(),
            location: "Medak, Telangana".to_string(),
            total_area_sqft: "600".to_string(),
            price_per_sqft_monthly: "20".to_string(),
            amenities: AmenityChecks {
                water_access: true,
                fenced: true,
                ..AmenityChecks::default()
            },
            ..LandForm::default()
        };
        let fields = form.validate().unwrap();
        assert_eq!(fields.title, "Sunny Garden Plot");
        assert!(fields.water_access);
        assert_eq!(fields.amenities, vec!["Fenced".to_string()]);
        assert_eq!(fields.soil_type, None);
    }

    #[test]
    fn test_produce_form_requires_known_unit() {
        let form = ProduceForm {
            name: "Tomatoes".to_string(),
            category: "vegetables".to_string(),
            price_per_unit: "60".to_string(),
            unit: "crate".to_string(),
            quantity_available: "25".to_string(),
            ..ProduceForm::default()
        };
        assert_eq!(form.validate().unwrap_err(), vec!["Please choose a unit"]);

        let fields = ProduceForm {
            unit: "dozen".to_string(),
            ..form
        }
        .validate()
        .unwrap();
        assert_eq!(fields.quantity_available, 25);
    }

    #[test]
    fn test_price_has_an_upper_bound() {
        let form = EquipmentForm {
            name: "Tractor".to_string(),
            category: "heavy machinery".to_string(),
            price_per_day: "79228162514264337593543950335".to_string(),
            ..EquipmentForm::default()
        };
        assert_eq!(
            form.validate().unwrap_err(),
            vec!["Price per day must be at most ₹10,000,000"]
        );

        let fields = EquipmentForm {
            price_per_day: "10,000,000".to_string(),
            ..form
        }
        .validate()
        .unwrap();
        assert_eq!(fields.price_per_day, Money::from_rupees(10_000_000));
    }

    #[test]
    fn test_equipment_form_optional_condition() {
        let form = EquipmentForm {
            name: "Tractor".to_string(),
            category: "heavy machinery".to_string(),
            price_per_day: "1,500".to_string(),
            ..EquipmentForm::default()
        };
        let fields = form.validate().unwrap();
        assert_eq!(fields.condition, None);
        assert_eq!(fields.price_per_day, Money::from_rupees(1500));

        let bad = EquipmentForm {
            condition: "mint".to_string(),
            ..form
        };
        assert_eq!(bad.validate().unwrap_err(), vec!["Please choose a condition"]);
    }
}
