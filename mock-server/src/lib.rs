use std::{collections::BTreeMap, sync::Arc};

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tracing::{info, warn};

const DEFAULT_LIMIT: i64 = 50;
const MAX_LIMIT: i64 = 100;
const SCATTER_LIMIT: usize = 500;
const AGE_BUCKETS: [&str; 5] = ["<30", "30-40", "40-50", "50-60", "60+"];

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Patient {
    pub patient_id: String,
    pub timestamp: i64,
    #[serde(rename = "Pregnancies")]
    pub pregnancies: f64,
    #[serde(rename = "Glucose")]
    pub glucose: f64,
    #[serde(rename = "BloodPressure")]
    pub blood_pressure: f64,
    #[serde(rename = "SkinThickness")]
    pub skin_thickness: f64,
    #[serde(rename = "Insulin")]
    pub insulin: f64,
    #[serde(rename = "BMI")]
    pub bmi: f64,
    #[serde(rename = "DiabetesPedigreeFunction")]
    pub diabetes_pedigree_function: f64,
    #[serde(rename = "Age")]
    pub age: f64,
    #[serde(rename = "Outcome")]
    pub outcome: u8,
    pub risk_score: f64,
    pub risk_level: String,
    pub age_group: String,
    pub bmi_category: String,
}

impl Patient {
    /// Build a record from raw measurements, deriving the score and
    /// categories the way the ingestion pipeline does.
    #[allow(clippy::too_many_arguments)]
    pub fn from_measurements(
        patient_id: &str,
        pregnancies: f64,
        glucose: f64,
        blood_pressure: f64,
        skin_thickness: f64,
        insulin: f64,
        bmi: f64,
        diabetes_pedigree_function: f64,
        age: f64,
        outcome: u8,
    ) -> Self {
        let risk_score = ((glucose / 200.0) * 0.3
            + (bmi / 50.0) * 0.2
            + (age / 100.0) * 0.2
            + (blood_pressure / 150.0) * 0.15
            + diabetes_pedigree_function * 0.15)
            .clamp(0.0, 1.0);

        Self {
            patient_id: patient_id.to_string(),
            timestamp: 1_714_564_800,
            pregnancies,
            glucose,
            blood_pressure,
            skin_thickness,
            insulin,
            bmi,
            diabetes_pedigree_function,
            age,
            outcome,
            risk_score,
            risk_level: risk_level_for(risk_score).to_string(),
            age_group: age_group_for(age).to_string(),
            bmi_category: bmi_category_for(bmi).to_string(),
        }
    }
}

// Bins are right-inclusive: (0, 0.3] is LOW, (0.3, 0.5] is MEDIUM, ...
fn risk_level_for(score: f64) -> &'static str {
    match score {
        s if s <= 0.3 => "LOW",
        s if s <= 0.5 => "MEDIUM",
        s if s <= 0.7 => "HIGH",
        _ => "CRITICAL",
    }
}

fn age_group_for(age: f64) -> &'static str {
    match age {
        a if a <= 30.0 => "<30",
        a if a <= 40.0 => "30-40",
        a if a <= 50.0 => "40-50",
        a if a <= 60.0 => "50-60",
        _ => "60+",
    }
}

fn bmi_category_for(bmi: f64) -> &'static str {
    match bmi {
        b if b <= 18.5 => "Underweight",
        b if b <= 25.0 => "Normal",
        b if b <= 30.0 => "Overweight",
        _ => "Obese",
    }
}

/// Histogram bucket used by the distribution chart. Unlike `age_group`,
/// lower bounds are inclusive.
fn age_bucket_for(age: i64) -> &'static str {
    match age {
        a if a < 30 => "<30",
        a if a < 40 => "30-40",
        a if a < 50 => "40-50",
        a if a < 60 => "50-60",
        _ => "60+",
    }
}

/// Ten records from the Pima diabetes set, covering every risk level.
pub fn seed_patients() -> Vec<Patient> {
    vec![
        Patient::from_measurements("PT-00001", 6.0, 148.0, 72.0, 35.0, 0.0, 33.6, 0.627, 50.0, 1),
        Patient::from_measurements("PT-00002", 1.0, 85.0, 66.0, 29.0, 0.0, 26.6, 0.351, 31.0, 0),
        Patient::from_measurements("PT-00003", 8.0, 183.0, 64.0, 0.0, 0.0, 23.3, 0.672, 32.0, 1),
        Patient::from_measurements("PT-00004", 1.0, 89.0, 66.0, 23.0, 94.0, 28.1, 0.167, 21.0, 0),
        Patient::from_measurements("PT-00005", 0.0, 137.0, 40.0, 35.0, 168.0, 43.1, 2.288, 33.0, 1),
        Patient::from_measurements("PT-00006", 5.0, 116.0, 74.0, 0.0, 0.0, 25.6, 0.201, 30.0, 0),
        Patient::from_measurements("PT-00007", 3.0, 78.0, 50.0, 32.0, 88.0, 31.0, 0.248, 26.0, 1),
        Patient::from_measurements("PT-00008", 10.0, 115.0, 0.0, 0.0, 0.0, 35.3, 0.134, 29.0, 0),
        Patient::from_measurements("PT-00009", 2.0, 70.0, 0.0, 0.0, 0.0, 20.0, 0.1, 22.0, 0),
        Patient::from_measurements("PT-00010", 2.0, 197.0, 70.0, 45.0, 543.0, 30.5, 0.158, 63.0, 1),
    ]
}

pub type Db = Arc<Vec<Patient>>;

/// Error envelope response: `{"status":"error","error":{...}}`.
#[derive(Debug)]
pub struct ApiFailure {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl ApiFailure {
    fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiFailure {
    fn into_response(self) -> Response {
        warn!(status = %self.status, code = self.code, message = %self.message, "request failed");
        let body = json!({
            "status": "error",
            "error": { "code": self.code, "message": self.message }
        });
        (self.status, Json(body)).into_response()
    }
}

fn timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

fn success(data: Value, extra: Value) -> Json<Value> {
    let mut metadata = json!({ "timestamp": timestamp() });
    if let (Some(meta), Value::Object(extra)) = (metadata.as_object_mut(), extra) {
        meta.extend(extra);
    }
    Json(json!({ "status": "success", "data": data, "metadata": metadata }))
}

fn to_value<T: Serialize>(value: &T) -> Result<Value, ApiFailure> {
    serde_json::to_value(value).map_err(|e| {
        ApiFailure::new(StatusCode::INTERNAL_SERVER_ERROR, "SERIALIZATION_ERROR", e.to_string())
    })
}

pub fn app() -> Router {
    app_with(seed_patients())
}

pub fn app_with(patients: Vec<Patient>) -> Router {
    let db: Db = Arc::new(patients);
    Router::new()
        .route("/health", get(health))
        .route("/api/patients", get(list_patients))
        .route("/api/patients/{id}", get(get_patient))
        .route("/api/statistics", get(statistics))
        .route("/api/visualizations/scatter", get(scatter))
        .route("/api/visualizations/distribution", get(distribution))
        .with_state(db)
}

/// Every route answers 500 with the given error envelope.
pub fn app_failing(code: &'static str, message: &str) -> Router {
    let message = message.to_string();
    Router::new().fallback(move || {
        let message = message.clone();
        async move { ApiFailure::new(StatusCode::INTERNAL_SERVER_ERROR, code, message) }
    })
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    run_app(listener, app()).await
}

pub async fn run_app(listener: TcpListener, app: Router) -> Result<(), std::io::Error> {
    axum::serve(listener, app).await
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": "api",
        "timestamp": timestamp()
    }))
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub limit: Option<i64>,
    pub risk_level: Option<String>,
}

async fn list_patients(
    State(db): State<Db>,
    Query(params): Query<ListParams>,
) -> Result<Json<Value>, ApiFailure> {
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT);
    if !(1..=MAX_LIMIT).contains(&limit) {
        return Err(ApiFailure::new(
            StatusCode::BAD_REQUEST,
            "INVALID_PARAMETER",
            format!("limit must be between 1 and {MAX_LIMIT}"),
        ));
    }
    let risk_level = params.risk_level.map(|level| level.to_uppercase());
    info!(limit, risk_level = ?risk_level, "listing patients");

    let matching: Vec<&Patient> = db
        .iter()
        .filter(|p| risk_level.as_deref().map_or(true, |level| p.risk_level == level))
        .collect();
    let has_more = matching.len() > limit as usize;
    let patients: Vec<&Patient> = matching.into_iter().take(limit as usize).collect();

    let filters = match &risk_level {
        Some(level) => json!({ "risk_level": level }),
        None => json!({}),
    };
    Ok(success(
        json!({
            "patients": to_value(&patients)?,
            "count": patients.len(),
            "has_more": has_more,
        }),
        json!({ "filters": filters }),
    ))
}

async fn get_patient(
    State(db): State<Db>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiFailure> {
    let patient = db.iter().find(|p| p.patient_id == id).ok_or_else(|| {
        ApiFailure::new(
            StatusCode::NOT_FOUND,
            "PATIENT_NOT_FOUND",
            format!("Patient {id} not found"),
        )
    })?;
    Ok(success(to_value(patient)?, json!({})))
}

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

fn mean(db: &[Patient], field: impl Fn(&Patient) -> f64) -> f64 {
    if db.is_empty() {
        return 0.0;
    }
    db.iter().map(field).sum::<f64>() / db.len() as f64
}

fn count_by<'a>(keys: impl Iterator<Item = &'a str>) -> BTreeMap<String, u64> {
    let mut counts = BTreeMap::new();
    for key in keys {
        *counts.entry(key.to_string()).or_insert(0) += 1;
    }
    counts
}

async fn statistics(State(db): State<Db>) -> Json<Value> {
    let total = db.len();
    let diabetic = db.iter().filter(|p| p.outcome == 1).count();
    let prevalence = if total > 0 {
        diabetic as f64 / total as f64
    } else {
        0.0
    };

    success(
        json!({
            "total_patients": total,
            "diabetes_prevalence": round_to(prevalence, 3),
            "risk_distribution": count_by(db.iter().map(|p| p.risk_level.as_str())),
            "age_distribution": count_by(db.iter().map(|p| p.age_group.as_str())),
            "averages": {
                "glucose": round_to(mean(&db, |p| p.glucose), 1),
                "bmi": round_to(mean(&db, |p| p.bmi), 1),
                "age": round_to(mean(&db, |p| p.age), 1),
            }
        }),
        json!({}),
    )
}

async fn scatter(State(db): State<Db>) -> Json<Value> {
    let points: Vec<Value> = db
        .iter()
        .take(SCATTER_LIMIT)
        .map(|p| {
            json!({
                "patient_id": p.patient_id,
                "bmi": p.bmi,
                "glucose": p.glucose,
                "age": p.age as i64,
                "risk_level": p.risk_level,
                "outcome": p.outcome,
            })
        })
        .collect();

    success(
        Value::Array(points),
        json!({
            "chart_type": "scatter",
            "x_axis": "BMI",
            "y_axis": "Glucose",
            "color": "risk_level",
        }),
    )
}

async fn distribution(State(db): State<Db>) -> Json<Value> {
    let mut ages: BTreeMap<String, u64> =
        AGE_BUCKETS.iter().map(|bucket| (bucket.to_string(), 0)).collect();
    for patient in db.iter() {
        *ages.entry(age_bucket_for(patient.age as i64).to_string()).or_insert(0) += 1;
    }

    success(
        json!({
            "age_distribution": ages,
            "risk_distribution": count_by(db.iter().map(|p| p.risk_level.as_str())),
        }),
        json!({ "chart_type": "distribution" }),
    )
}
