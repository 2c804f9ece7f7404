/// Reasons the input to a bulk, sorted construction was rejected.
///
/// `index` is the position of the first item that does not compare strictly greater than the one
/// before it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum BuildError {
    #[error("input is not sorted: item {index} is less than the item before it")]
    Unsorted { index: usize },
    #[error("duplicate key: item {index} is equal to the item before it")]
    DuplicateKey { index: usize },
}
