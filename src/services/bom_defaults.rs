use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder};

use crate::entities::{mrp_bom, product, product_template, ProductId, UomId, UserId};
use crate::errors::{ServiceError, ServiceResult};

/// Values a BOM contributes to a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BomDefaults {
    pub bom_id: i32,
    pub uom_id: Option<UomId>,
    pub product_owner_id: Option<UserId>,
    pub admin_id: Option<UserId>,
}

impl From<&mrp_bom::Model> for BomDefaults {
    fn from(bom: &mrp_bom::Model) -> Self {
        Self {
            bom_id: bom.id,
            uom_id: bom.product_uom_id,
            product_owner_id: bom.product_owner_id,
            admin_id: bom.admin_id,
        }
    }
}

pub async fn load_product<C: ConnectionTrait>(
    db: &C,
    product_id: ProductId,
) -> ServiceResult<(product::Model, Option<product_template::Model>)> {
    product::Entity::find_by_id(product_id)
        .find_also_related(product_template::Entity)
        .one(db)
        .await
        .map_err(ServiceError::db_error)?
        .ok_or_else(|| ServiceError::not_found("Product", product_id))
}

/// Most recently modified BOM of a product template.
pub async fn latest_bom_for_template<C: ConnectionTrait>(
    db: &C,
    product_tmpl_id: i32,
) -> ServiceResult<Option<mrp_bom::Model>> {
    mrp_bom::Entity::find()
        .filter(mrp_bom::Column::ProductTmplId.eq(product_tmpl_id))
        .order_by_desc(mrp_bom::Column::UpdatedAt)
        .order_by_desc(mrp_bom::Column::Id)
        .one(db)
        .await
        .map_err(ServiceError::db_error)
}

pub async fn bom_exists_for_template<C: ConnectionTrait>(
    db: &C,
    product_tmpl_id: i32,
) -> ServiceResult<bool> {
    let count = mrp_bom::Entity::find()
        .filter(mrp_bom::Column::ProductTmplId.eq(product_tmpl_id))
        .count(db)
        .await
        .map_err(ServiceError::db_error)?;
    Ok(count > 0)
}

pub async fn load_bom<C: ConnectionTrait>(db: &C, bom_id: i32) -> ServiceResult<mrp_bom::Model> {
    mrp_bom::Entity::find_by_id(bom_id)
        .one(db)
        .await
        .map_err(ServiceError::db_error)?
        .ok_or_else(|| ServiceError::not_found("Bill of materials", bom_id))
}
