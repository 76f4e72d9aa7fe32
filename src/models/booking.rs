use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

use super::status::BookingStatus;
use super::user::is_valid_email;
use crate::errors::AppError;

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const TIME_FORMAT: &str = "%H:%M";
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: String,
    pub email: String,
    pub name: String,
    pub phone: String,
    pub address: String,
    pub vehicle_number: String,
    pub service_type: ServiceType,
    pub date: NaiveDate,
    #[serde(serialize_with = "serialize_time")]
    pub time: NaiveTime,
    pub status: BookingStatus,
    pub kilometers: Option<f64>,
    pub amount: Option<f64>,
    pub delivery_date: Option<NaiveDate>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ServiceType {
    #[serde(rename = "General Service")]
    GeneralService,
    #[serde(rename = "Oil Change")]
    OilChange,
    #[serde(rename = "Water Wash")]
    WaterWash,
    #[serde(rename = "Brake Service")]
    BrakeService,
}

impl ServiceType {
    pub const ALL: [ServiceType; 4] = [
        ServiceType::GeneralService,
        ServiceType::OilChange,
        ServiceType::WaterWash,
        ServiceType::BrakeService,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceType::GeneralService => "General Service",
            ServiceType::OilChange => "Oil Change",
            ServiceType::WaterWash => "Water Wash",
            ServiceType::BrakeService => "Brake Service",
        }
    }

    pub fn parse(s: &str) -> Result<Self, AppError> {
        Self::ALL
            .into_iter()
            .find(|service| service.as_str() == s)
            .ok_or_else(|| AppError::Validation(format!("unknown service type '{s}'")))
    }
}

fn serialize_time<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&time.format(TIME_FORMAT).to_string())
}

/// Customer booking submission. Missing fields deserialize as empty strings so
/// that validation, not the JSON decoder, reports them.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewBooking {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub vehicle_number: String,
    #[serde(alias = "service")]
    pub service_type: String,
    pub date: String,
    pub time: String,
    /// Accepted for compatibility and ignored: new bookings always start Pending.
    pub status: Option<Value>,
}

impl Booking {
    /// Builds a fresh Pending booking with a new identifier.
    pub fn create(input: NewBooking, now: NaiveDateTime) -> Result<Self, AppError> {
        let name = required("name", &input.name)?;
        let email = required("email", &input.email)?;
        if !is_valid_email(&email) {
            return Err(AppError::Validation(format!("invalid email address '{email}'")));
        }
        let date = parse_date("date", required("date", &input.date)?.as_str())?;
        let time = parse_time(required("time", &input.time)?.as_str())?;
        let service_type = ServiceType::parse(input.service_type.trim())?;

        Ok(Booking {
            id: uuid::Uuid::new_v4().to_string(),
            email,
            name,
            phone: input.phone.trim().to_string(),
            address: input.address.trim().to_string(),
            vehicle_number: input.vehicle_number.trim().to_string(),
            service_type,
            date,
            time,
            status: BookingStatus::Pending,
            kilometers: None,
            amount: None,
            delivery_date: None,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn apply(&mut self, patch: &BookingPatch, now: NaiveDateTime) {
        if let Some(kilometers) = patch.kilometers {
            self.kilometers = kilometers;
        }
        if let Some(amount) = patch.amount {
            self.amount = amount;
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(delivery_date) = patch.delivery_date {
            self.delivery_date = delivery_date;
        }
        self.updated_at = now;
    }
}

fn required(field: &str, value: &str) -> Result<String, AppError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation(format!("{field} is required")));
    }
    Ok(trimmed.to_string())
}

pub fn parse_date(field: &str, raw: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT)
        .map_err(|_| AppError::Validation(format!("{field} must be YYYY-MM-DD, got '{raw}'")))
}

pub fn parse_time(raw: &str) -> Result<NaiveTime, AppError> {
    let raw = raw.trim();
    NaiveTime::parse_from_str(raw, TIME_FORMAT)
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
        .map_err(|_| AppError::Validation(format!("time must be HH:MM, got '{raw}'")))
}

/// Coerces a kilometers/amount value into a number. `null` and blank strings
/// mean "not set"; zero stays zero.
pub fn normalize_measure(field: &str, value: &Value) -> Result<Option<f64>, AppError> {
    let number = match value {
        Value::Null => return Ok(None),
        Value::Number(n) => n.as_f64(),
        Value::String(s) if s.trim().is_empty() => return Ok(None),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    match number {
        Some(n) if n.is_finite() && n >= 0.0 => Ok(Some(n)),
        Some(n) if n.is_finite() => Err(AppError::Validation(format!(
            "{field} must not be negative, got {n}"
        ))),
        _ => Err(AppError::Validation(format!("{field} must be a number, got {value}"))),
    }
}

/// Admin partial update. Each outer `Option` says whether the key was present;
/// inner `None` clears the value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookingPatch {
    pub kilometers: Option<Option<f64>>,
    pub amount: Option<Option<f64>>,
    pub status: Option<BookingStatus>,
    pub delivery_date: Option<Option<NaiveDate>>,
}

impl BookingPatch {
    pub const FIELDS: [&'static str; 4] = ["kilometers", "amount", "status", "deliveryDate"];

    pub fn from_json(body: &Value) -> Result<Self, AppError> {
        let fields = body
            .as_object()
            .ok_or_else(|| AppError::Validation("patch must be a JSON object".to_string()))?;

        if let Some(unknown) = fields.keys().find(|k| !Self::FIELDS.contains(&k.as_str())) {
            return Err(AppError::InvalidField(format!(
                "'{unknown}' cannot be updated; allowed fields are {}",
                Self::FIELDS.join(", ")
            )));
        }

        let mut patch = BookingPatch::default();
        for (key, value) in fields {
            match key.as_str() {
                "kilometers" => patch.kilometers = Some(normalize_measure(key, value)?),
                "amount" => patch.amount = Some(normalize_measure(key, value)?),
                "status" => {
                    let raw = value.as_str().ok_or_else(|| {
                        AppError::InvalidStatus(format!("status must be a string, got {value}"))
                    })?;
                    patch.status = Some(BookingStatus::parse(raw)?);
                }
                "deliveryDate" => {
                    patch.delivery_date = Some(match value {
                        Value::Null => None,
                        Value::String(s) if s.trim().is_empty() => None,
                        Value::String(s) => Some(parse_date("deliveryDate", s)?),
                        other => {
                            return Err(AppError::Validation(format!(
                                "deliveryDate must be YYYY-MM-DD, got {other}"
                            )))
                        }
                    });
                }
                _ => unreachable!("keys were checked against the allow-list"),
            }
        }

        if patch.is_empty() {
            return Err(AppError::Validation(
                "patch must contain at least one field".to_string(),
            ));
        }
        Ok(patch)
    }

    pub fn is_empty(&self) -> bool {
        self.kilometers.is_none()
            && self.amount.is_none()
            && self.status.is_none()
            && self.delivery_date.is_none()
    }
}
