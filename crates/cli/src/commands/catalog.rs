//! Catalog browsing and admin changes.

use tracing::info;

use modaverse_storefront::catalog::{
    Product, ProductDraft, ProductImage, ProductQuery, product_by_slug,
};
use modaverse_storefront::{AppState, StorefrontError};

use super::{fetch, money};
use crate::ProductArgs;

/// Look up one product by slug.
///
/// # Errors
///
/// Returns `StorefrontError::NotFound` if no product has that slug.
pub async fn find_by_slug(state: &AppState, slug: &str) -> Result<Product, StorefrontError> {
    fetch::<Product>(state, product_by_slug(Some(slug)))
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| StorefrontError::NotFound(format!("product '{slug}'")))
}

/// List products matching `query`, then narrow by `search`.
///
/// # Errors
///
/// Returns an error if the store rejects the query.
pub async fn list(
    state: &AppState,
    query: &ProductQuery,
    search: Option<&str>,
) -> Result<(), StorefrontError> {
    let products = fetch::<Product>(state, query.spec()).await?;
    let matching: Vec<&Product> = products
        .iter()
        .filter(|product| search.is_none_or(|term| product.matches_search(term)))
        .collect();

    for product in &matching {
        let discount = product
            .discount_percent()
            .map(|percent| format!(" (-{percent}%)"))
            .unwrap_or_default();
        info!(
            "{:<24} {:<10} {:>10}{discount}",
            product.slug,
            product.category,
            money(state, product.price).to_string(),
        );
    }
    info!(count = matching.len(), "Products listed");
    Ok(())
}

/// Show a product's details.
///
/// # Errors
///
/// Returns an error if the product does not exist.
pub async fn show(state: &AppState, slug: &str) -> Result<(), StorefrontError> {
    let product = find_by_slug(state, slug).await?;

    info!("{} [{}]", product.name, product.category);
    match product.original_price {
        Some(original) if product.discount_percent().is_some() => info!(
            "Price: {} (was {})",
            money(state, product.price),
            money(state, original)
        ),
        _ => info!("Price: {}", money(state, product.price)),
    }
    if let Some(badge) = &product.badge {
        info!("Badge: {badge}");
    }
    info!("{}", product.description);
    for detail in &product.details {
        info!("  - {detail}");
    }
    match product.average_rating() {
        Some(rating) => info!("Rating: {rating}/5 from {} reviews", product.reviews.len()),
        None => info!("No reviews yet"),
    }
    Ok(())
}

/// Copy the given fields onto `draft`. New images replace the old ones and
/// take the product name as alt text.
fn apply(fields: ProductArgs, draft: &mut ProductDraft) {
    if let Some(name) = fields.name {
        draft.name = name;
    }
    if let Some(category) = fields.category {
        draft.category = category;
    }
    if let Some(price) = fields.price {
        draft.price = price;
    }
    if let Some(original) = fields.original_price {
        draft.original_price = Some(original);
    }
    if let Some(description) = fields.description {
        draft.description = description;
    }
    if !fields.details.is_empty() {
        draft.details = fields.details;
    }
    if let Some(badge) = fields.badge {
        draft.badge = Some(badge);
    }
    if !fields.images.is_empty() {
        let images = fields
            .images
            .into_iter()
            .enumerate()
            .map(|(n, url)| ProductImage {
                id: format!("{}-{}", draft.slug, n + 1),
                url,
                alt: draft.name.clone(),
                hint: None,
            })
            .collect();
        draft.images = images;
    }
}

/// Add a product.
///
/// # Errors
///
/// Returns `StorefrontError::Inventory` if a required field is missing, the
/// price is not positive or the slug is taken.
pub fn add(state: &AppState, slug: String, fields: ProductArgs) -> Result<(), StorefrontError> {
    let mut draft = ProductDraft {
        slug,
        ..ProductDraft::default()
    };
    apply(fields, &mut draft);

    let product = state.create_product(&draft)?;
    info!(
        "Added {} ({}) at {}",
        product.name,
        product.slug,
        money(state, product.price)
    );
    Ok(())
}

/// Change the product with `slug`.
///
/// # Errors
///
/// Returns an error if the product does not exist or the change is
/// rejected.
pub async fn edit(
    state: &AppState,
    slug: &str,
    rename: Option<String>,
    clear_original_price: bool,
    fields: ProductArgs,
) -> Result<(), StorefrontError> {
    let current = find_by_slug(state, slug).await?;
    let mut draft = ProductDraft::from(&current);
    if let Some(slug) = rename {
        draft.slug = slug;
    }
    if clear_original_price {
        draft.original_price = None;
    }
    apply(fields, &mut draft);

    let product = state.update_product(&current.id, &draft)?;
    info!(
        "Updated {} ({}) at {}",
        product.name,
        product.slug,
        money(state, product.price)
    );
    Ok(())
}

/// Remove the product with `slug`. Saved carts keep their lines for it.
///
/// # Errors
///
/// Returns an error if the product does not exist.
pub async fn delete(state: &AppState, slug: &str) -> Result<(), StorefrontError> {
    let product = find_by_slug(state, slug).await?;
    state.delete_product(&product.id)?;
    info!("Deleted {} ({})", product.name, product.slug);
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;

    fn no_changes() -> ProductArgs {
        ProductArgs {
            name: None,
            category: None,
            price: None,
            original_price: None,
            images: Vec::new(),
            description: None,
            details: Vec::new(),
            badge: None,
        }
    }

    #[test]
    fn test_apply_keeps_fields_not_given() {
        let mut draft = ProductDraft {
            slug: "wool-scarf".to_string(),
            name: "Wool Scarf".to_string(),
            category: "Accessories".to_string(),
            price: Decimal::new(3999, 2),
            details: vec!["100% alpaca".to_string()],
            ..ProductDraft::default()
        };
        let before = draft.clone();

        apply(no_changes(), &mut draft);
        assert_eq!(draft, before);

        apply(
            ProductArgs {
                price: Some(Decimal::new(2999, 2)),
                original_price: Some(Decimal::new(3999, 2)),
                ..no_changes()
            },
            &mut draft,
        );
        assert_eq!(draft.price, Decimal::new(2999, 2));
        assert_eq!(draft.original_price, Some(Decimal::new(3999, 2)));
        assert_eq!(draft.details, before.details);
    }

    #[test]
    fn test_apply_numbers_new_images() {
        let mut draft = ProductDraft {
            slug: "wool-scarf".to_string(),
            name: "Wool Scarf".to_string(),
            ..ProductDraft::default()
        };
        apply(
            ProductArgs {
                images: vec![
                    "https://cdn.moda-verse.pe/scarf.jpg".to_string(),
                    "https://cdn.moda-verse.pe/scarf-back.jpg".to_string(),
                ],
                ..no_changes()
            },
            &mut draft,
        );

        let ids: Vec<_> = draft.images.iter().map(|image| image.id.as_str()).collect();
        assert_eq!(ids, vec!["wool-scarf-1", "wool-scarf-2"]);
        assert_eq!(draft.images.first().unwrap().alt, "Wool Scarf");
    }
}
