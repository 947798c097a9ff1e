/// Upstream identifiers behind a public model name.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct UpstreamModelInfo {
    /// Public name exposed to clients (lowercase).
    pub name: String,
    /// Value of the upstream `model` body field.
    pub model: String,
    /// Value of the upstream `chatModelId` body field.
    pub chat_model_id: String,
    /// Feature switches sent as `supportFunctions`.
    pub support_functions: Vec<String>,
}

struct ModelEntry {
    name: &'static str,
    model: &'static str,
    chat_model_id: &'static str,
    support_functions: &'static [&'static str],
}

const INTERNET_SEARCH: &[&str] = &["supportInternetSearch"];

const MODELS: &[ModelEntry] = &[
    ModelEntry {
        name: "deepseek-v3",
        model: "gpt_175B_0404",
        chat_model_id: "deep_seek_v3",
        support_functions: &[],
    },
    ModelEntry {
        name: "deepseek-r1",
        model: "gpt_175B_0404",
        chat_model_id: "deep_seek",
        support_functions: &[],
    },
    ModelEntry {
        name: "deepseek-v3-search",
        model: "gpt_175B_0404",
        chat_model_id: "deep_seek_v3",
        support_functions: INTERNET_SEARCH,
    },
    ModelEntry {
        name: "deepseek-r1-search",
        model: "gpt_175B_0404",
        chat_model_id: "deep_seek",
        support_functions: INTERNET_SEARCH,
    },
    ModelEntry {
        name: "hunyuan",
        model: "gpt_175B_0404",
        chat_model_id: "hunyuan_gpt_175B_0404",
        support_functions: &[],
    },
    ModelEntry {
        name: "hunyuan-t1",
        model: "gpt_175B_0404",
        chat_model_id: "hunyuan_t1",
        support_functions: &[],
    },
    ModelEntry {
        name: "hunyuan-search",
        model: "gpt_175B_0404",
        chat_model_id: "hunyuan_gpt_175B_0404",
        support_functions: INTERNET_SEARCH,
    },
    ModelEntry {
        name: "hunyuan-t1-search",
        model: "gpt_175B_0404",
        chat_model_id: "hunyuan_t1",
        support_functions: INTERNET_SEARCH,
    },
];

/// Resolves a public model name (case-insensitive) to upstream identifiers.
pub fn resolve_model(public_name: &str) -> Option<UpstreamModelInfo> {
    let wanted = public_name.trim().to_ascii_lowercase();
    MODELS.iter().find(|m| m.name == wanted).map(|m| UpstreamModelInfo {
        name: m.name.to_string(),
        model: m.model.to_string(),
        chat_model_id: m.chat_model_id.to_string(),
        support_functions: m.support_functions.iter().map(|f| f.to_string()).collect(),
    })
}

/// Public model names in a stable order.
pub fn supported_models() -> impl Iterator<Item = &'static str> {
    MODELS.iter().map(|m| m.name)
}
