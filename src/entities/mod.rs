pub mod mail_activity;
pub mod mail_activity_type;
pub mod mail_message;
pub mod mrp_bom;
pub mod mrp_operation;
pub mod mrp_production;
pub mod mrp_request;
pub mod mrp_workorder;
pub mod product;
pub mod product_template;
pub mod uom;
pub mod user;
pub mod user_role;

pub use mrp_production::ProductionState;
pub use mrp_request::RequestState;
pub use mrp_workorder::WorkorderState;
pub use user_role::Role;

pub type RequestId = i32;
pub type ProductionId = i32;
pub type WorkorderId = i32;
pub type UserId = i32;
pub type ProductId = i32;
pub type BomId = i32;
pub type UomId = i32;

/// Model names used to address chatter messages and activities.
pub const REQUEST_MODEL: &str = "mrp_request";
pub const PRODUCTION_MODEL: &str = "mrp_production";
pub const USER_MODEL: &str = "users";
