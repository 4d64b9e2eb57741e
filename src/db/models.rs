/// Rows written by one `store_output` call.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct StoreSummary {
    pub tunes: usize,
    pub settings: usize,
    pub sets: usize,
    pub recordings: usize,
    pub sessions: usize,
    pub users: usize,
    pub errors: usize,
}

/// A tune matched by a search-text query.
#[derive(Debug, Clone, PartialEq)]
pub struct TuneHit {
    pub tune_id: i64,
    pub name: String,
    pub tune_type: String,
    pub popularity: i64,
    pub setting_count: i64,
}

/// A session matched by a search-text query.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionHit {
    pub session_id: i64,
    pub name: String,
    pub full_address: String,
}

/// Catalog statistics.
#[derive(Debug)]
pub struct CatalogStats {
    pub tunes: i64,
    pub settings: i64,
    pub sets: i64,
    pub recordings: i64,
    pub sessions: i64,
    pub users: i64,
    pub import_errors: i64,
    pub tune_types: Vec<(String, i64)>,
}
