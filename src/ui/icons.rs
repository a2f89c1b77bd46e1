pub struct Icons;

impl Icons {
    pub const BOOK: &str = "📚";
    pub const CHECK: &str = "✅";
    pub const CROSS: &str = "❌";
    pub const WARN: &str = "⚠️";
    pub const INFO: &str = "ℹ️";
    pub const STATS: &str = "📊";
    pub const SEARCH: &str = "🔍";
    pub const HEART: &str = "❤️";
    pub const COMMENT: &str = "💬";
    pub const STAR: &str = "⭐";
    pub const PERSON: &str = "👤";
    pub const LOCK: &str = "🔒";
    pub const WRENCH: &str = "🔧";
    pub const DEL: &str = "🗑️";
    pub const EMPTY: &str = "∅";
}
