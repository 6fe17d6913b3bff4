//! Object-level permission predicates.
//!
//! Authentication happens first (see [`super::auth::CurrentUser`]); these
//! checks are pure functions over the resolved principal and, where the
//! rule is per-object, the target row. Handlers run them after the target
//! lookup, so a missing row is a 404 before it can become a 403.

use crate::entities::{products, users};

/// Accounts may only be edited by the user they belong to.
#[must_use]
pub const fn is_account_owner(principal: &users::Model, target: &users::Model) -> bool {
    principal.id == target.id
}

/// Management endpoints are reserved for superusers.
#[must_use]
pub const fn is_admin(principal: &users::Model) -> bool {
    principal.is_superuser
}

/// Only accounts flagged as sellers may create products.
#[must_use]
pub const fn is_authenticated_seller(principal: &users::Model) -> bool {
    principal.is_seller
}

/// Product writes are restricted to the owning seller.
#[must_use]
pub const fn is_product_owner(principal: &users::Model, product: &products::Model) -> bool {
    principal.id == product.user_id
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal::Decimal;

    fn user(id: i32) -> users::Model {
        users::Model {
            id,
            email: format!("user{id}@mail.com"),
            password_hash: String::new(),
            first_name: "Test".to_string(),
            last_name: "User".to_string(),
            is_seller: false,
            is_active: true,
            is_staff: true,
            is_superuser: false,
            date_joined: Utc::now(),
            last_login: Utc::now(),
        }
    }

    fn product(id: i32, user_id: i32) -> products::Model {
        products::Model {
            id,
            description: "Bike".to_string(),
            price: Decimal::new(250_000, 2),
            quantity: 5,
            is_active: true,
            user_id,
        }
    }

    #[test]
    fn account_owner_is_exact_identity() {
        let alice = user(1);
        let bob = user(2);
        assert!(is_account_owner(&alice, &alice));
        assert!(!is_account_owner(&alice, &bob));
    }

    #[test]
    fn admin_requires_superuser_flag() {
        let mut admin = user(1);
        assert!(!is_admin(&admin));
        admin.is_superuser = true;
        assert!(is_admin(&admin));
    }

    #[test]
    fn seller_flag_gates_product_creation() {
        let mut seller = user(1);
        assert!(!is_authenticated_seller(&seller));
        seller.is_seller = true;
        assert!(is_authenticated_seller(&seller));
    }

    #[test]
    fn product_owner_matches_on_user_id() {
        let owner = user(7);
        let intruder = user(8);
        let bike = product(1, 7);
        assert!(is_product_owner(&owner, &bike));
        assert!(!is_product_owner(&intruder, &bike));
    }
}
