pub mod normalize;
pub mod rank;

pub use normalize::{OfferDefaults, OfferNormalizer, RawProviderOffer};
pub use rank::rank_offers;
