//! Display names for reference fields, used for change detection and messages.

use sea_orm::{ConnectionTrait, EntityTrait};

use crate::entities::{mrp_bom, product, product_template, uom, user, BomId, ProductId, UomId, UserId};
use crate::errors::{ServiceError, ServiceResult};

use super::change_tracking::TrackedValue;

pub async fn product_name<C: ConnectionTrait>(db: &C, id: ProductId) -> ServiceResult<String> {
    let product = product::Entity::find_by_id(id)
        .one(db)
        .await
        .map_err(ServiceError::db_error)?
        .ok_or_else(|| ServiceError::not_found("Product", id))?;
    Ok(product.display_name())
}

pub async fn uom_name<C: ConnectionTrait>(db: &C, id: UomId) -> ServiceResult<String> {
    uom::Entity::find_by_id(id)
        .one(db)
        .await
        .map_err(ServiceError::db_error)?
        .map(|u| u.name)
        .ok_or_else(|| ServiceError::not_found("Unit of measure", id))
}

pub async fn user_name<C: ConnectionTrait>(db: &C, id: UserId) -> ServiceResult<String> {
    user::Entity::find_by_id(id)
        .one(db)
        .await
        .map_err(ServiceError::db_error)?
        .map(|u| u.name)
        .ok_or_else(|| ServiceError::not_found("User", id))
}

/// `code: template name`, or just the template name without a code.
pub async fn bom_name<C: ConnectionTrait>(db: &C, id: BomId) -> ServiceResult<String> {
    let (bom, template) = mrp_bom::Entity::find_by_id(id)
        .find_also_related(product_template::Entity)
        .one(db)
        .await
        .map_err(ServiceError::db_error)?
        .ok_or_else(|| ServiceError::not_found("Bill of materials", id))?;
    let template_name = template.map(|t| t.name).unwrap_or_default();
    Ok(match bom.code {
        Some(code) if !code.is_empty() => format!("{}: {}", code, template_name),
        _ => template_name,
    })
}

pub async fn product_value<C: ConnectionTrait>(db: &C, id: ProductId) -> ServiceResult<TrackedValue> {
    Ok(TrackedValue::Reference(product_name(db, id).await?))
}

pub async fn uom_value<C: ConnectionTrait>(db: &C, id: Option<UomId>) -> ServiceResult<TrackedValue> {
    Ok(match id {
        Some(id) => TrackedValue::Reference(uom_name(db, id).await?),
        None => TrackedValue::Unset,
    })
}

pub async fn user_value<C: ConnectionTrait>(db: &C, id: Option<UserId>) -> ServiceResult<TrackedValue> {
    Ok(match id {
        Some(id) => TrackedValue::Reference(user_name(db, id).await?),
        None => TrackedValue::Unset,
    })
}

pub async fn bom_value<C: ConnectionTrait>(db: &C, id: Option<BomId>) -> ServiceResult<TrackedValue> {
    Ok(match id {
        Some(id) => TrackedValue::Reference(bom_name(db, id).await?),
        None => TrackedValue::Unset,
    })
}
