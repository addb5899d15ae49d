use poise::ChoiceParameter;
use strum::{EnumIter, IntoEnumIterator};
use time::Weekday;

#[derive(ChoiceParameter, EnumIter, Clone, Copy, Debug, PartialEq, Eq)]
pub enum GameDay {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl GameDay {
    /// Case-insensitive lookup by English name, e.g. `thursday` or `Thu`.
    pub fn from_name(name: &str) -> Option<GameDay> {
        let name = name.trim().to_ascii_lowercase();
        if name.len() < 3 {
            return None;
        }

        GameDay::iter().find(|day| {
            let weekday = Weekday::from(*day).to_string().to_ascii_lowercase();
            weekday.starts_with(&name)
        })
    }
}

impl From<GameDay> for Weekday {
    fn from(value: GameDay) -> Self {
        use GameDay::*;

        match value {
            Monday => Weekday::Monday,
            Tuesday => Weekday::Tuesday,
            Wednesday => Weekday::Wednesday,
            Thursday => Weekday::Thursday,
            Friday => Weekday::Friday,
            Saturday => Weekday::Saturday,
            Sunday => Weekday::Sunday,
        }
    }
}

#[cfg(test)]
mod tests {
    use time::Weekday;

    use super::GameDay;

    #[test]
    fn full_names() {
        assert_eq!(GameDay::from_name("Thursday"), Some(GameDay::Thursday));
        assert_eq!(GameDay::from_name("sunday"), Some(GameDay::Sunday));
    }

    #[test]
    fn abbreviations() {
        assert_eq!(GameDay::from_name("thu"), Some(GameDay::Thursday));
        assert_eq!(GameDay::from_name(" SAT "), Some(GameDay::Saturday));
    }

    #[test]
    fn rejects_other_words() {
        assert_eq!(GameDay::from_name("t"), None);
        assert_eq!(GameDay::from_name("Caturday"), None);
        assert_eq!(GameDay::from_name(""), None);
    }

    #[test]
    fn converts_to_weekday() {
        assert_eq!(Weekday::from(GameDay::Wednesday), Weekday::Wednesday);
    }
}
