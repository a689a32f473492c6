use crate::{
    error::{Result, ShelfError},
    record::{GameRecord, GameStatus},
};

/// In-memory record list of one profile. Index order is persistence order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GameCollection {
    records: Vec<GameRecord>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusCounts {
    pub owned: usize,
    pub in_progress: usize,
    pub finished: usize,
    pub wishlisted: usize,
}

impl StatusCounts {
    pub fn get(&self, status: GameStatus) -> usize {
        match status {
            GameStatus::Owned => self.owned,
            GameStatus::InProgress => self.in_progress,
            GameStatus::Finished => self.finished,
            GameStatus::Wishlisted => self.wishlisted,
        }
    }

    pub fn total(&self) -> usize {
        self.owned + self.in_progress + self.finished + self.wishlisted
    }
}

impl GameCollection {
    pub fn new(records: Vec<GameRecord>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[GameRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&GameRecord> {
        self.records.get(index)
    }

    pub fn find_duplicate(
        &self,
        title: &str,
        platform: &str,
        exclude: Option<usize>,
    ) -> Option<usize> {
        self.records
            .iter()
            .enumerate()
            .filter(|(index, _)| Some(*index) != exclude)
            .find(|(_, record)| record.same_key(title, platform))
            .map(|(index, _)| index)
    }

    pub fn add(&mut self, record: GameRecord) -> Result<usize> {
        if self
            .find_duplicate(&record.title, &record.platform, None)
            .is_some()
        {
            return Err(duplicate(&record));
        }
        self.records.push(record);
        Ok(self.records.len() - 1)
    }

    pub fn update(&mut self, index: usize, record: GameRecord) -> Result<()> {
        self.check_index(index)?;
        if self
            .find_duplicate(&record.title, &record.platform, Some(index))
            .is_some()
        {
            return Err(duplicate(&record));
        }
        self.records[index] = record;
        Ok(())
    }

    /// Removes the record at `index`. Every index above it shifts down by one.
    pub fn delete(&mut self, index: usize) -> Result<GameRecord> {
        self.check_index(index)?;
        Ok(self.records.remove(index))
    }

    /// Records ordered by case-insensitive title, each paired with its index in
    /// the persisted list. Equal titles keep insertion order.
    pub fn sorted_view(&self) -> impl Iterator<Item = (usize, &GameRecord)> + '_ {
        let mut order: Vec<(String, usize)> = self
            .records
            .iter()
            .enumerate()
            .map(|(index, record)| (record.sort_key(), index))
            .collect();
        order.sort_by(|a, b| a.0.cmp(&b.0));
        order
            .into_iter()
            .map(move |(_, index)| (index, &self.records[index]))
    }

    pub fn status_counts(&self) -> StatusCounts {
        let mut counts = StatusCounts::default();
        for record in &self.records {
            match record.status {
                GameStatus::Owned => counts.owned += 1,
                GameStatus::InProgress => counts.in_progress += 1,
                GameStatus::Finished => counts.finished += 1,
                GameStatus::Wishlisted => counts.wishlisted += 1,
            }
        }
        counts
    }

    fn check_index(&self, index: usize) -> Result<()> {
        if index >= self.records.len() {
            return Err(ShelfError::OutOfRange {
                index,
                len: self.records.len(),
            });
        }
        Ok(())
    }
}

fn duplicate(record: &GameRecord) -> ShelfError {
    ShelfError::DuplicateRecord {
        title: record.title.clone(),
        platform: record.platform.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::GameDraft;

    fn game(title: &str, platform: &str) -> GameRecord {
        GameDraft::new(title, platform, "", GameStatus::Owned)
            .into_record()
            .unwrap()
    }

    #[test]
    fn add_rejects_case_variant_duplicates() {
        let mut collection = GameCollection::default();
        collection.add(game("Tetris", "GB")).unwrap();
        let err = collection.add(game("TETRIS", "gb")).unwrap_err();
        assert!(matches!(err, ShelfError::DuplicateRecord { .. }));
        assert_eq!(collection.len(), 1);

        collection.add(game("Tetris", "NES")).unwrap();
        assert_eq!(collection.len(), 2);
    }

    #[test]
    fn update_may_match_itself() {
        let mut collection = GameCollection::new(vec![game("Doom", "PC")]);
        let mut changed = game("DOOM", "pc");
        changed.status = GameStatus::Finished;
        collection.update(0, changed).unwrap();
        assert_eq!(collection.get(0).unwrap().title, "DOOM");
        assert_eq!(collection.get(0).unwrap().status, GameStatus::Finished);
    }

    #[test]
    fn update_onto_other_record_leaves_collection_unchanged() {
        let mut collection = GameCollection::new(vec![game("Doom", "PC"), game("Quake", "PC")]);
        let before = collection.clone();
        let err = collection.update(1, game("doom", "PC")).unwrap_err();
        assert!(matches!(err, ShelfError::DuplicateRecord { .. }));
        assert_eq!(collection, before);
    }

    #[test]
    fn update_checks_range_before_duplicates() {
        let mut collection = GameCollection::new(vec![game("Doom", "PC")]);
        let err = collection.update(3, game("Doom", "PC")).unwrap_err();
        assert!(matches!(err, ShelfError::OutOfRange { index: 3, len: 1 }));
    }

    #[test]
    fn delete_removes_and_shifts() {
        let mut collection = GameCollection::new(vec![
            game("Alpha", "PC"),
            game("Beta", "PC"),
            game("Gamma", "PC"),
        ]);
        let removed = collection.delete(1).unwrap();
        assert_eq!(removed.title, "Beta");
        assert_eq!(collection.len(), 2);
        assert_eq!(collection.get(1).unwrap().title, "Gamma");
        assert!(matches!(
            collection.delete(2),
            Err(ShelfError::OutOfRange { index: 2, len: 2 })
        ));
    }

    #[test]
    fn sorted_view_pairs_original_indices() {
        let collection = GameCollection::new(vec![
            game("zelda", "NES"),
            game("Advance Wars", "GBA"),
            game("Metroid", "NES"),
        ]);
        let view: Vec<(usize, &str)> = collection
            .sorted_view()
            .map(|(index, record)| (index, record.title.as_str()))
            .collect();
        assert_eq!(view, vec![(1, "Advance Wars"), (2, "Metroid"), (0, "zelda")]);
    }

    #[test]
    fn sorted_view_is_stable_for_equal_titles() {
        let collection = GameCollection::new(vec![
            game("Tetris", "NES"),
            game("Alleyway", "GB"),
            game("tetris", "GB"),
        ]);
        let platforms: Vec<&str> = collection
            .sorted_view()
            .map(|(_, record)| record.platform.as_str())
            .collect();
        assert_eq!(platforms, vec!["GB", "NES", "GB"]);
        let indices: Vec<usize> = collection.sorted_view().map(|(index, _)| index).collect();
        assert_eq!(indices, vec![1, 0, 2]);
    }

    #[test]
    fn stale_index_is_rederived_from_view() {
        let mut collection = GameCollection::new(vec![
            game("Alpha", "PC"),
            game("Beta", "PC"),
            game("Gamma", "PC"),
        ]);
        let gamma = collection
            .sorted_view()
            .find(|(_, record)| record.title == "Gamma")
            .map(|(index, _)| index)
            .unwrap();
        assert_eq!(gamma, 2);
        collection.delete(0).unwrap();
        assert!(collection.get(gamma).is_none());
        let gamma = collection
            .sorted_view()
            .find(|(_, record)| record.title == "Gamma")
            .map(|(index, _)| index)
            .unwrap();
        assert_eq!(gamma, 1);
    }

    #[test]
    fn status_counts_tally_each_status() {
        let mut wish = game("Okami", "PS2");
        wish.status = GameStatus::Wishlisted;
        let collection = GameCollection::new(vec![game("Doom", "PC"), wish]);
        let counts = collection.status_counts();
        assert_eq!(counts.get(GameStatus::Owned), 1);
        assert_eq!(counts.get(GameStatus::Wishlisted), 1);
        assert_eq!(counts.total(), 2);
    }
}
