use utoipa::OpenApi;

use crate::handlers::orders;

#[derive(OpenApi)]
#[openapi(
    paths(
        orders::create_order,
        orders::list_orders,
        orders::get_order,
        orders::get_timeline,
        orders::update_status,
        orders::get_payment,
        orders::update_payment,
    ),
    tags(
        (name = "orders", description = "Checkout and order lifecycle"),
        (name = "payments", description = "Payment status tracking"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_route_is_documented() {
        let doc = ApiDoc::openapi();
        let paths: Vec<&String> = doc.paths.paths.keys().collect();
        for expected in [
            "/orders",
            "/orders/{id}",
            "/orders/{id}/timeline",
            "/orders/{id}/status",
            "/orders/{id}/payment",
        ] {
            assert!(
                paths.iter().any(|p| p.as_str() == expected),
                "missing {}",
                expected
            );
        }
    }
}
