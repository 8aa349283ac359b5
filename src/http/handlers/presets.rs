use axum::Json;
use serde::Serialize;

use crate::agents::{self, AgentDescriptor};

#[derive(Serialize)]
pub struct PresetInfo {
    pub name: String,
    pub agents: Vec<AgentDescriptor>,
}

/// GET /api/presets - The fixed delegation rosters, in table order
pub async fn list_presets() -> Json<Vec<PresetInfo>> {
    let presets = agents::preset_names()
        .into_iter()
        .filter_map(|name| {
            agents::preset(name).map(|agents| PresetInfo {
                name: name.to_string(),
                agents,
            })
        })
        .collect();
    Json(presets)
}
