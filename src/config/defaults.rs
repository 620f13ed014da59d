//! Default values for configuration

/// Default Generative Language API base URL
pub fn default_api_base_url() -> String {
    std::env::var("DOCQA_API_BASE_URL")
        .unwrap_or_else(|_| "https://generativelanguage.googleapis.com/v1beta/".to_string())
}

/// Default environment variable holding the API key
pub fn default_api_key_env() -> String {
    "GOOGLE_API_KEY".to_string()
}

/// Default embedding model
pub fn default_embedding_model() -> String {
    std::env::var("GOOGLE_EMBEDDING_MODEL").unwrap_or_else(|_| "models/embedding-001".to_string())
}

/// Default embedding request timeout in seconds
pub fn default_embedding_timeout() -> u64 {
    30
}

/// Default number of embedding retries
pub fn default_embedding_retries() -> usize {
    2
}

/// Default generation model
pub fn default_generation_model() -> String {
    "models/gemini-1.5-flash".to_string()
}

/// Default generation request timeout in seconds
pub fn default_generation_timeout() -> u64 {
    60
}

/// Default maximum characters per chunk
pub fn default_chunk_max_chars() -> usize {
    800
}

/// Default number of chunks fed to the synthesizer
pub fn default_query_top_k() -> usize {
    3
}

/// Default user agent for page fetches
pub fn default_web_user_agent() -> String {
    format!("Mozilla/5.0 (compatible; docqa/{})", env!("CARGO_PKG_VERSION"))
}

/// Default page fetch timeout in seconds
pub fn default_web_timeout() -> u64 {
    15
}

/// Default cap on extracted page text, in characters
pub fn default_web_max_chars() -> usize {
    15000
}
