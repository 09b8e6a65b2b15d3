//! OpenAPI document for the `/api` surface, served at `/api/openapi.json` and
//! rendered at `/api/docs`.

use utoipa::{
    Modify, OpenApi,
    openapi::security::{ApiKey, ApiKeyValue, HttpAuthScheme, HttpBuilder, SecurityScheme},
};

use crate::{analysis, api, db};

/// Bearer and cookie schemes; both carry the identity-service JWT.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.security_schemes.insert(
                "BearerAuth".to_string(),
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some(
                            "Access token issued by the identity service:\n\n\
                            ```\nAuthorization: Bearer YOUR_ACCESS_TOKEN\n```",
                        ))
                        .build(),
                ),
            );
            components.security_schemes.insert(
                "CookieAuth".to_string(),
                SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::with_description(
                    "sb-access-token",
                    "The same access token, set as a cookie by the dashboard",
                ))),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "MachPlan API",
        description = "Drawing analysis and machining plans for CNC shops. Every record is private to the authenticated user."
    ),
    servers(
        (url = "/api", description = "MachPlan API")
    ),
    modifiers(&SecurityAddon),
    paths(
        api::handlers::extraction::extract_pdf_text,
        api::handlers::analyze::analyze,
        api::handlers::analyze::analyze_pdf,
        api::handlers::analyze::test_connection,
        api::handlers::analyses::list_analyses,
        api::handlers::analyses::create_analysis,
        api::handlers::analyses::get_analysis,
        api::handlers::analyses::update_analysis,
        api::handlers::analyses::delete_analysis,
        api::handlers::drawings::get_drawing,
        api::handlers::drawings::delete_drawing,
        api::handlers::machines::list_machines,
        api::handlers::machines::create_machine,
        api::handlers::machines::get_machine,
        api::handlers::machines::update_machine,
        api::handlers::machines::delete_machine,
        api::handlers::tools::list_tools,
        api::handlers::tools::create_tool,
        api::handlers::tools::get_tool,
        api::handlers::tools::update_tool,
        api::handlers::tools::delete_tool,
        api::handlers::cutting_parameters::list_cutting_parameters,
        api::handlers::cutting_parameters::create_cutting_parameter,
        api::handlers::cutting_parameters::get_cutting_parameter,
        api::handlers::cutting_parameters::update_cutting_parameter,
        api::handlers::cutting_parameters::delete_cutting_parameter,
        api::handlers::presets::list_presets,
        api::handlers::presets::create_preset,
        api::handlers::presets::get_preset,
        api::handlers::presets::update_preset,
        api::handlers::presets::delete_preset,
        api::handlers::presets::duplicate_preset,
        api::handlers::models_stub::models_status,
        api::handlers::models_stub::models_echo,
        api::handlers::log::read_log,
    ),
    components(
        schemas(
            analysis::AnalysisResult,
            analysis::Feature,
            analysis::MachiningPlan,
            analysis::Operation,
            db::models::analyses::DrawingType,
            db::models::analyses::ProcessType,
            db::models::analyses::AnalysisStatus,
            api::models::analyses::AnalysisResponse,
            api::models::analyses::AnalysisUpdate,
            api::models::analyze::AnalyzeRequest,
            api::models::analyze::AnalyzePdfRequest,
            api::models::analyze::AnalyzePdfResponse,
            api::models::analyze::ConnectionTestResponse,
            api::models::extraction::ExtractPdfResponse,
            api::models::machines::MachineRequest,
            api::models::machines::MachineResponse,
            api::models::tools::ToolRequest,
            api::models::tools::ToolResponse,
            api::models::cutting_parameters::CuttingParameterRequest,
            api::models::cutting_parameters::CuttingParameterResponse,
            api::models::presets::PresetRequest,
            api::models::presets::PresetResponse,
            api::models::presets::PresetListResponse,
            api::models::presets::PresetDeleteResponse,
            api::models::status::LogResponse,
            api::models::status::ModelsRouteStatus,
            api::models::status::ModelsRouteEcho,
        )
    ),
    tags(
        (name = "extraction", description = "Text extraction from PDF drawings."),
        (name = "analysis", description = "Direct model calls: structured drawing analysis and free-text reports."),
        (name = "analyses", description = "Persisted analyses. Uploading a drawing runs the full pipeline and stores the result."),
        (name = "drawings", description = "Uploaded drawings. Drawings are removed automatically once their retention period ends."),
        (name = "machines", description = "The shop's machines."),
        (name = "tools", description = "The shop's tool inventory. Analyses recommend tools from this list."),
        (name = "cutting-parameters", description = "Reference cutting data per material and tool type."),
        (name = "presets", description = "Named analysis presets, served under `/my/models`."),
        (name = "status", description = "Diagnostics and legacy routes. No authentication required."),
    )
)]
pub struct ApiDoc;
