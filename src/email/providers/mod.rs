pub mod null;
pub mod ses;
