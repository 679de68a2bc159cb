/// What the running service advertises about itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceInfo {
    pub name: String,
    /// `http://<public_host>:<port>`
    pub address: String,
}
