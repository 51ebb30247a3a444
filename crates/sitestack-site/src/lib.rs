//! The static website stack.
//!
//! [`static_website`] declares everything needed to serve two HTML pages
//! from an S3 website endpoint behind a CloudFront distribution:
//!
//! ```text
//! static-website-bucket
//!   ├── ownership-controls ──┐
//!   ├── public-access-block ─┴─> website-config ─> static-site-distribution
//!   │        │                         │
//!   │        └──────> bucket-policy <──┘
//!   └── index.html, error.html
//! ```
//!
//! The website configuration and the bucket policy carry explicit ordering
//! edges on the public access block: S3 rejects a public policy while the
//! bucket still blocks public policies, and nothing in their properties
//! refers to the block.

mod content;
mod distribution;
mod program;

pub use content::SiteContent;
pub use distribution::website_distribution;
pub use program::{
    BUCKET_NAME, CLOUDFRONT_URL, DISTRIBUTION_ID, S3_WEBSITE_URL, StaticWebsite, static_website,
    static_website_with,
};
