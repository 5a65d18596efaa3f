use {
    crate::kernel::entities::UserId,
    serde::Serialize,
    time::OffsetDateTime,
    utoipa::ToSchema,
};

#[derive(Clone, Debug, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id:         UserId,
    pub name:       String,
    /// Unique across the store.
    pub email:      String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}
