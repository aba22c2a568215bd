use hubuum_authz::GroupId;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, PartialEq, Eq)]
pub struct Group {
    #[schema(value_type = i64)]
    pub id: GroupId,
    pub name: String,
}
