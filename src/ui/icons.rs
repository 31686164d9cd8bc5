pub struct Icons;

impl Icons {
    pub const CHECK: &str = "✅";
    pub const INFO: &str = "ℹ️";
    pub const NEW: &str = "✨";
    pub const DEL: &str = "🗑️";
    pub const LIST: &str = "📋";
    pub const REPEAT: &str = "🔁";
}
