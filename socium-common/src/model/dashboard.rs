use serde::Serialize;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub user_count: u64,
    pub post_count: u64,
    pub comment_count: u64,
    pub activated_user_count: u64,
}
