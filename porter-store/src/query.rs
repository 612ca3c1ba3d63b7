//! Helpers shared by the dynamic projection queries.

use porter_core::models::ListRequest;

/// LIKE pattern for the request's search text, `None` when filtering is
/// disabled. `prefix` anchors the match at the start of the column;
/// anything else matches anywhere.
pub(crate) fn search_pattern(req: &ListRequest) -> Option<String> {
    if req.search.is_empty() {
        return None;
    }
    if req.match_type.eq_ignore_ascii_case("prefix") {
        Some(format!("{}%", req.search))
    } else {
        Some(format!("%{}%", req.search))
    }
}

pub(crate) fn sort_direction(req: &ListRequest) -> &'static str {
    if req.sort_order.eq_ignore_ascii_case("desc") {
        "DESC"
    } else {
        "ASC"
    }
}

/// Allowlisted sort column for the order-history projection. Unknown
/// values fall back to the identifier.
pub(crate) fn order_sort_field(requested: &str) -> &'static str {
    match requested {
        "name" | "product_name" => "p.name",
        "created_at" => "o.created_at",
        "shipped_status" => "o.shipped_status",
        "arrived_at" => "o.arrived_at",
        _ => "o.order_id",
    }
}

/// Allowlisted sort column for the product listing.
pub(crate) fn product_sort_field(requested: &str) -> &'static str {
    match requested {
        "name" => "name",
        "value" => "value",
        "weight" => "weight",
        _ => "product_id",
    }
}
