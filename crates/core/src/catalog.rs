//! The static EcomCloth product catalog.
//!
//! The storefront has no inventory backend; the six products below are the
//! whole catalog. Product detail views offer each product's colours and the
//! shared [`SIZES`] list.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

use crate::cart::CartItem;
use crate::types::{Price, ProductId};

/// Sizes offered on the product detail view.
pub const SIZES: [&str; 5] = ["S", "M", "L", "XL", "XXL"];

/// Size preselected on the product detail view.
pub const DEFAULT_SIZE: &str = "M";

/// Catalog department.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Men,
    Women,
}

impl Category {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Men => "Men",
            Self::Women => "Women",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error parsing a category name.
#[derive(Debug, thiserror::Error)]
#[error("unknown category: {0}")]
pub struct UnknownCategory(String);

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Men" => Ok(Self::Men),
            "Women" => Ok(Self::Women),
            other => Err(UnknownCategory(other.to_string())),
        }
    }
}

/// A catalog product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub price: Price,
    pub category: Category,
    pub image: String,
    pub colors: Vec<String>,
    pub description: String,
}

impl Product {
    /// Colour preselected on the detail view, if the product has any.
    #[must_use]
    pub fn default_color(&self) -> Option<&str> {
        self.colors.first().map(String::as_str)
    }

    /// Snapshot this product as a cart item with the chosen variant.
    #[must_use]
    pub fn to_cart_item(&self, color: Option<String>, size: Option<String>) -> CartItem {
        CartItem {
            product_id: self.id,
            name: self.name.clone(),
            unit_price: self.price,
            category: self.category.as_str().to_string(),
            image: self.image.clone(),
            color,
            size,
        }
    }
}

fn product(
    id: i32,
    name: &str,
    cents: i64,
    category: Category,
    image: &str,
    colors: &[&str],
    description: &str,
) -> Product {
    Product {
        id: ProductId::new(id),
        name: name.to_string(),
        price: Price::from_cents(cents),
        category,
        image: image.to_string(),
        colors: colors.iter().map(|c| (*c).to_string()).collect(),
        description: description.to_string(),
    }
}

static CATALOG: LazyLock<Vec<Product>> = LazyLock::new(|| {
    vec![
        product(
            1,
            "Men's Classic T-Shirt",
            2500,
            Category::Men,
            "/men/pexels-mostafasanadd-878358.jpg",
            &["White", "Black", "Blue"],
            "A classic men's t-shirt, perfect for everyday wear. Comfortable and stylish.",
        ),
        product(
            2,
            "Women's Summer Dress",
            4000,
            Category::Women,
            "/women/pexels-godisable-jacob-226636-794062.jpg",
            &["Red", "Yellow", "Green"],
            "A breezy summer dress for women, ideal for warm days and outings.",
        ),
        product(
            3,
            "Men's Denim Jacket",
            6000,
            Category::Men,
            "/men/pexels-pixabay-157675.jpg",
            &["Blue", "Black"],
            "A rugged denim jacket for men, adds style to any outfit.",
        ),
        product(
            4,
            "Women's Blouse",
            3000,
            Category::Women,
            "/women/pexels-olenagoldman-1021693.jpg",
            &["White", "Pink"],
            "A soft and elegant blouse for women, perfect for work or casual wear.",
        ),
        product(
            5,
            "Men's Chinos Pants",
            3500,
            Category::Men,
            "/men/pexels-cottonbro-7763204.jpg",
            &["Beige", "Navy"],
            "Versatile chinos pants for men, comfortable and stylish for any occasion.",
        ),
        product(
            6,
            "Women's Cardigan",
            4500,
            Category::Women,
            "/women/pexels-zayceva-tatiana-135444866-11971763.jpg",
            &["Gray", "Blue"],
            "A cozy cardigan for women, great for layering in any season.",
        ),
    ]
});

/// All products in catalog order.
#[must_use]
pub fn products() -> &'static [Product] {
    &CATALOG
}

/// Look up a product by ID.
#[must_use]
pub fn find(id: ProductId) -> Option<&'static Product> {
    CATALOG.iter().find(|p| p.id == id)
}

/// Products in a category, or all products when `category` is `None`.
pub fn by_category(category: Option<Category>) -> impl Iterator<Item = &'static Product> {
    CATALOG
        .iter()
        .filter(move |p| category.is_none_or(|c| p.category == c))
}
