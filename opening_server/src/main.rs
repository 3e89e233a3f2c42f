#[macro_use]
extern crate rocket;

use clap::Parser;
use log::warn;
use rocket::serde::json::Json;
use rocket::serde::Serialize;
use rocket::{Build, Rocket, State};
use opening::{
    named_patterns, AgeUpStats, Catalog, CivilizationStats, ClassifierVersion, MatchupStats, NamedPattern, Report,
    Store, StoreError, CLASSIFIER_VERSION,
};
use opening_tools::{GameDataArgs, StoreArgs};

/// Serves opening statistics from an ingested database
#[derive(Parser)]
struct Args {
    #[command(flatten)]
    store: StoreArgs,

    #[command(flatten)]
    game_data: GameDataArgs,

    /// Version that reports use when the request doesn't name one
    #[arg(long, env = "OPENING_CLASSIFIER_VERSION", default_value_t = CLASSIFIER_VERSION)]
    classifier_version: ClassifierVersion,
}

pub struct ServerState {
    store: Store,
    catalog: Catalog,
    version: ClassifierVersion,
}

#[derive(Responder, Debug)]
pub enum ApiError {
    #[response(status = 400, content_type = "json")]
    ApiUseError(Json<ApiUseError>),
    #[response(status = 500, content_type = "json")]
    ApiServerError(Json<ApiServerError>),
}

impl From<ApiUseError> for ApiError {
    fn from(err: ApiUseError) -> Self {
        Self::ApiUseError(Json(err))
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        warn!("Store request failed: {err}");
        Self::ApiServerError(Json(ApiServerError::StoreFailed {
            message: err.to_string(),
        }))
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(crate = "rocket::serde")]
pub struct InvalidParameter {
    name: &'static str,
    reason: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(crate = "rocket::serde", tag = "error", rename_all = "snake_case")]
pub enum ApiUseError {
    InvalidParameters {
        parameters: Vec<InvalidParameter>,
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(crate = "rocket::serde", tag = "error", rename_all = "snake_case")]
pub enum ApiServerError {
    StoreFailed {
        message: String,
    },
}

type ApiResult<T> = Result<Json<T>, ApiError>;

fn validate_version(version: Option<ClassifierVersion>, default: ClassifierVersion) -> Result<ClassifierVersion, ApiUseError> {
    match version {
        None => Ok(default),
        Some(version) if (1..=CLASSIFIER_VERSION).contains(&version) => Ok(version),
        Some(version) => Err(ApiUseError::InvalidParameters {
            parameters: vec![InvalidParameter {
                name: "version",
                reason: format!("No classifier has version={version}. \
                                 Pass a version from 1 to {CLASSIFIER_VERSION} or remove the version attribute."),
            }],
        }),
    }
}

fn report(state: &ServerState, version: Option<ClassifierVersion>) -> Result<Report, ApiError> {
    let version = validate_version(version, state.version)?;
    Ok(Report::from_store(&state.store, &state.catalog, version)?)
}

#[get("/openings")]
fn get_openings() -> Json<Vec<NamedPattern>> {
    Json(named_patterns())
}

#[get("/report?<version>")]
fn get_report(version: Option<ClassifierVersion>, state: &State<ServerState>) -> ApiResult<Report> {
    Ok(Json(report(state, version)?))
}

#[get("/matchups?<version>")]
fn get_matchups(version: Option<ClassifierVersion>, state: &State<ServerState>) -> ApiResult<Vec<MatchupStats>> {
    Ok(Json(report(state, version)?.matchups))
}

#[get("/civilizations?<version>")]
fn get_civilizations(version: Option<ClassifierVersion>, state: &State<ServerState>) -> ApiResult<Vec<CivilizationStats>> {
    Ok(Json(report(state, version)?.civilizations))
}

#[get("/age_ups?<version>")]
fn get_age_ups(version: Option<ClassifierVersion>, state: &State<ServerState>) -> ApiResult<Vec<AgeUpStats>> {
    Ok(Json(report(state, version)?.age_ups))
}

fn build_rocket(state: ServerState) -> Rocket<Build> {
    rocket::build()
        .mount("/v1", routes![get_openings, get_report, get_matchups, get_civilizations, get_age_ups])
        .manage(state)
}

#[rocket::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let state = ServerState {
        store: args.store.open_store()?,
        catalog: args.game_data.load_catalog()?,
        version: args.classifier_version,
    };

    let _rocket = build_rocket(state)
        .launch()
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use rocket::http::Status;
    use rocket::local::blocking::Client;
    use super::*;

    fn client() -> Client {
        let state = ServerState {
            store: Store::temporary().unwrap(),
            catalog: Catalog::default(),
            version: CLASSIFIER_VERSION,
        };
        Client::tracked(build_rocket(state)).unwrap()
    }

    #[test]
    fn lists_openings_in_report_order() {
        let client = client();
        let response = client.get("/v1/openings").dispatch();
        assert_eq!(response.status(), Status::Ok);
        let body: rocket::serde::json::Value = response.into_json().unwrap();
        let names: Vec<&str> = body.as_array().unwrap().iter()
            .map(|pattern| pattern["name"].as_str().unwrap())
            .collect();
        assert_eq!(names.first(), Some(&"PremillDrush"));
        assert_eq!(names.last(), Some(&"DidNothing"));
    }

    #[test]
    fn empty_store_reports_nothing() {
        let client = client();
        let response = client.get("/v1/report").dispatch();
        assert_eq!(response.status(), Status::Ok);
        let body: rocket::serde::json::Value = response.into_json().unwrap();
        assert_eq!(body["total_concluded"], 0);
        assert!(body["civilizations"].as_array().unwrap().is_empty());
    }

    #[test]
    fn rejects_unknown_classifier_versions() {
        let client = client();
        let response = client.get("/v1/matchups?version=0").dispatch();
        assert_eq!(response.status(), Status::BadRequest);
        let body: rocket::serde::json::Value = response.into_json().unwrap();
        assert_eq!(body["error"], "invalid_parameters");
        assert_eq!(body["parameters"][0]["name"], "version");
    }
}
