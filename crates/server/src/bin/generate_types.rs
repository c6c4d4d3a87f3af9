use std::{env, fs, path::PathBuf};

use server::routes::{
    ListResponse, Source, WriteResponse,
    analyze_charts::{
        AnalysisHistoryResponse, LatestAnalysisResponse, SaveAnalysisRequest, SaveAnalysisResponse,
    },
    health::VersionInfo,
    pairs::{PairsResponse, SavePairsRequest, SavePairsResponse},
    projects::{ModelProfileRequest, ProjectRequest, VideoRequest},
};
use services::services::{
    chart_analyzer::{Bias, ChartAnalysisRequest, ChartAnalysisResult},
    coach::{ChatTurn, CoachReply, CoachRequest},
    database_validator::DatabaseReport,
    entry_models::EntryModel,
    model_builder::{
        EntryModelDraft, ExplainModelRequest, ModelGuide, SuggestModelRequest,
        SuggestModelResponse, VideoModelResponse, VideoSource, VideoToModelRequest,
    },
    quiz::{GenerateQuizRequest, ModelQuizRequest, QuizCategory, QuizQuestion, QuizResponse},
    study_plan::{StudyPlan, StudyPlanRequest, StudyPlanResponse, StudyWeek},
    youtube::VideoMetadata,
};
use ts_rs::TS;
use utils::config::DeploymentInfo;

fn generate_types_content() -> String {
    let header = "// This file was generated by `cargo run --bin generate-types`.\n\
                  // Do not edit this file manually.\n";

    let decls = [
        Source::decl(),
        ListResponse::<()>::decl(),
        WriteResponse::<()>::decl(),
        DeploymentInfo::decl(),
        VersionInfo::decl(),
        DatabaseReport::decl(),
        PairsResponse::decl(),
        SavePairsRequest::decl(),
        SavePairsResponse::decl(),
        db::models::chart_analysis::ChartAnalysis::decl(),
        LatestAnalysisResponse::decl(),
        AnalysisHistoryResponse::decl(),
        SaveAnalysisRequest::decl(),
        SaveAnalysisResponse::decl(),
        db::models::project::Project::decl(),
        db::models::model_profile::ModelProfile::decl(),
        db::models::video::Video::decl(),
        ProjectRequest::decl(),
        ModelProfileRequest::decl(),
        VideoRequest::decl(),
        ChatTurn::decl(),
        CoachRequest::decl(),
        CoachReply::decl(),
        QuizCategory::decl(),
        QuizQuestion::decl(),
        QuizResponse::decl(),
        GenerateQuizRequest::decl(),
        ModelQuizRequest::decl(),
        EntryModelDraft::decl(),
        EntryModel::decl(),
        ModelGuide::decl(),
        ExplainModelRequest::decl(),
        SuggestModelRequest::decl(),
        SuggestModelResponse::decl(),
        VideoToModelRequest::decl(),
        VideoSource::decl(),
        VideoMetadata::decl(),
        VideoModelResponse::decl(),
        StudyPlanRequest::decl(),
        StudyWeek::decl(),
        StudyPlan::decl(),
        StudyPlanResponse::decl(),
        Bias::decl(),
        ChartAnalysisRequest::decl(),
        ChartAnalysisResult::decl(),
    ];

    let body = decls
        .into_iter()
        .map(|d| format!("export {}", d.trim_start_matches("export ")))
        .collect::<Vec<_>>()
        .join("\n\n");

    format!("{header}\n{body}\n")
}

fn main() {
    let check_mode = env::args().any(|arg| arg == "--check");
    let out_path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../shared/types.ts");
    let generated = generate_types_content();

    if check_mode {
        let current = fs::read_to_string(&out_path).unwrap_or_default();
        if current == generated {
            println!("shared/types.ts is up to date.");
            return;
        }
        eprintln!("shared/types.ts is out of date. Run `cargo run --bin generate-types`.");
        std::process::exit(1);
    }

    if let Some(parent) = out_path.parent() {
        if let Err(e) = fs::create_dir_all(parent) {
            eprintln!("Failed to create {}: {e}", parent.display());
            std::process::exit(1);
        }
    }
    if let Err(e) = fs::write(&out_path, generated) {
        eprintln!("Failed to write {}: {e}", out_path.display());
        std::process::exit(1);
    }
    println!("Wrote {}", out_path.display());
}
