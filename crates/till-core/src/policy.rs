//! # Access Policy
//!
//! Role and ownership rules for sale operations.
//!
//! | Operation | Admin | Cashier          |
//! |-----------|-------|------------------|
//! | post      | yes   | yes              |
//! | view/list | all   | own sales only   |
//! | edit      | all   | own sales only   |
//! | void      | yes   | no               |

use crate::error::{CoreError, CoreResult};
use crate::types::{Caller, Sale};

pub fn ensure_can_view(caller: &Caller, sale: &Sale) -> CoreResult<()> {
    if caller.is_admin() || sale.user_id == caller.user_id {
        Ok(())
    } else {
        Err(CoreError::Forbidden(format!(
            "sale {} belongs to another user",
            sale.id
        )))
    }
}

pub fn ensure_can_edit(caller: &Caller, sale: &Sale) -> CoreResult<()> {
    if caller.is_admin() || sale.user_id == caller.user_id {
        Ok(())
    } else {
        Err(CoreError::Forbidden(format!(
            "cashiers may only edit their own sales (sale {})",
            sale.id
        )))
    }
}

pub fn ensure_can_void(caller: &Caller) -> CoreResult<()> {
    if caller.is_admin() {
        Ok(())
    } else {
        Err(CoreError::Forbidden(
            "only an administrator may void a sale".to_string(),
        ))
    }
}

/// Owner restriction to apply when listing sales, if any.
pub fn visible_owner(caller: &Caller) -> Option<i64> {
    if caller.is_admin() {
        None
    } else {
        Some(caller.user_id)
    }
}
