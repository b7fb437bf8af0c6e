//! Shopfront storefront library.
//!
//! The client-side state layer of the storefront: a catalog store, a cart
//! kept in local storage, a wishlist, and the [`session::ShopSession`] that
//! the presentation layer drives.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod catalog;
pub mod commerce;
pub mod config;
pub mod error;
pub mod session;
pub mod storage;
pub mod wishlist;
