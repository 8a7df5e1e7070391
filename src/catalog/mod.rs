pub mod casts;
pub mod comments;
pub mod films;
pub mod genres;
pub mod locks;

pub use casts::CastDirectory;
pub use comments::CommentService;
pub use films::FilmService;
pub use genres::GenreDirectory;
pub use locks::AggregateLocks;

use std::collections::HashMap;

use crate::db::DocId;

/// Arranges `docs` in the order their ids appear in `ids`, dropping ids that
/// did not resolve.
pub(crate) fn in_order<T>(ids: &[DocId], docs: Vec<T>, id_of: impl Fn(&T) -> DocId) -> Vec<T> {
    let mut by_id: HashMap<DocId, T> = docs.into_iter().map(|doc| (id_of(&doc), doc)).collect();
    ids.iter().filter_map(|id| by_id.remove(id)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_order_follows_ids_and_skips_missing() {
        let (a, b, c) = (DocId::new(), DocId::new(), DocId::new());
        let ordered = in_order(&[c, a, b], vec![a, b], |id| *id);
        assert_eq!(ordered, vec![a, b]);

        let ordered = in_order(&[b, a], vec![a, b], |id| *id);
        assert_eq!(ordered, vec![b, a]);
    }
}
