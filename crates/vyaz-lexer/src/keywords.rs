//! Reserved word table.
//!
//! The table is a compile-time `match`; alternate spellings map to the same
//! kind. The first spelling listed for a kind is its canonical form.

use crate::token::TokenKind;

/// Every reserved spelling, canonical spellings first within each kind.
pub const KEYWORDS: &[(&str, TokenKind)] = &[
    ("пусть", TokenKind::Let),
    ("конст", TokenKind::Const),
    ("константа", TokenKind::Const),
    ("перем", TokenKind::Var),
    ("переменная", TokenKind::Var),
    ("функция", TokenKind::Function),
    ("фн", TokenKind::Function),
    ("вернуть", TokenKind::Return),
    ("возврат", TokenKind::Return),
    ("если", TokenKind::If),
    ("иначе", TokenKind::Else),
    ("для", TokenKind::For),
    ("пока", TokenKind::While),
    ("делать", TokenKind::Do),
    ("прервать", TokenKind::Break),
    ("продолжить", TokenKind::Continue),
    ("выбор", TokenKind::Switch),
    ("случай", TokenKind::Case),
    ("поумолчанию", TokenKind::Default),
    ("по_умолчанию", TokenKind::Default),
    ("класс", TokenKind::Class),
    ("расширяет", TokenKind::Extends),
    ("реализует", TokenKind::Implements),
    ("интерфейс", TokenKind::Interface),
    ("тип", TokenKind::Type),
    ("импорт", TokenKind::Import),
    ("экспорт", TokenKind::Export),
    ("из", TokenKind::From),
    ("как", TokenKind::As),
    ("новый", TokenKind::New),
    ("новая", TokenKind::New),
    ("новое", TokenKind::New),
    ("этот", TokenKind::This),
    ("это", TokenKind::This),
    ("родитель", TokenKind::Super),
    ("супер", TokenKind::Super),
    ("типа", TokenKind::Typeof),
    ("экземпляр", TokenKind::Instanceof),
    ("в", TokenKind::In),
    ("пустота", TokenKind::Void),
    ("пусто", TokenKind::Null),
    ("нуль", TokenKind::Null),
    ("неопределено", TokenKind::Undefined),
    ("истина", TokenKind::True),
    ("правда", TokenKind::True),
    ("ложь", TokenKind::False),
    ("асинх", TokenKind::Async),
    ("асинхронная", TokenKind::Async),
    ("асинхронный", TokenKind::Async),
    ("ждать", TokenKind::Await),
    ("ожидать", TokenKind::Await),
    ("попытка", TokenKind::Try),
    ("пробовать", TokenKind::Try),
    ("перехват", TokenKind::Catch),
    ("поймать", TokenKind::Catch),
    ("наконец", TokenKind::Finally),
    ("бросить", TokenKind::Throw),
    ("выбросить", TokenKind::Throw),
    ("статический", TokenKind::Static),
    ("статичный", TokenKind::Static),
    ("публичный", TokenKind::Public),
    ("открытый", TokenKind::Public),
    ("приватный", TokenKind::Private),
    ("закрытый", TokenKind::Private),
    ("защищенный", TokenKind::Protected),
    ("защищённый", TokenKind::Protected),
    ("толькочтение", TokenKind::Readonly),
    ("только_чтение", TokenKind::Readonly),
    ("абстрактный", TokenKind::Abstract),
    ("абстрактная", TokenKind::Abstract),
    ("удалить", TokenKind::Delete),
];

/// Looks up a scanned word; `None` means it is an ordinary identifier.
pub fn keyword_kind(word: &str) -> Option<TokenKind> {
    let kind = match word {
        "пусть" => TokenKind::Let,
        "конст" | "константа" => TokenKind::Const,
        "перем" | "переменная" => TokenKind::Var,
        "функция" | "фн" => TokenKind::Function,
        "вернуть" | "возврат" => TokenKind::Return,
        "если" => TokenKind::If,
        "иначе" => TokenKind::Else,
        "для" => TokenKind::For,
        "пока" => TokenKind::While,
        "делать" => TokenKind::Do,
        "прервать" => TokenKind::Break,
        "продолжить" => TokenKind::Continue,
        "выбор" => TokenKind::Switch,
        "случай" => TokenKind::Case,
        "поумолчанию" | "по_умолчанию" => TokenKind::Default,
        "класс" => TokenKind::Class,
        "расширяет" => TokenKind::Extends,
        "реализует" => TokenKind::Implements,
        "интерфейс" => TokenKind::Interface,
        "тип" => TokenKind::Type,
        "импорт" => TokenKind::Import,
        "экспорт" => TokenKind::Export,
        "из" => TokenKind::From,
        "как" => TokenKind::As,
        "новый" | "новая" | "новое" => TokenKind::New,
        "этот" | "это" => TokenKind::This,
        "родитель" | "супер" => TokenKind::Super,
        "типа" => TokenKind::Typeof,
        "экземпляр" => TokenKind::Instanceof,
        "в" => TokenKind::In,
        "пустота" => TokenKind::Void,
        "пусто" | "нуль" => TokenKind::Null,
        "неопределено" => TokenKind::Undefined,
        "истина" | "правда" => TokenKind::True,
        "ложь" => TokenKind::False,
        "асинх" | "асинхронная" | "асинхронный" => TokenKind::Async,
        "ждать" | "ожидать" => TokenKind::Await,
        "попытка" | "пробовать" => TokenKind::Try,
        "перехват" | "поймать" => TokenKind::Catch,
        "наконец" => TokenKind::Finally,
        "бросить" | "выбросить" => TokenKind::Throw,
        "статический" | "статичный" => TokenKind::Static,
        "публичный" | "открытый" => TokenKind::Public,
        "приватный" | "закрытый" => TokenKind::Private,
        "защищенный" | "защищённый" => TokenKind::Protected,
        "толькочтение" | "только_чтение" => TokenKind::Readonly,
        "абстрактный" | "абстрактная" => TokenKind::Abstract,
        "удалить" => TokenKind::Delete,
        _ => return None,
    };
    Some(kind)
}

/// Canonical spelling of a keyword kind, `None` for non-keywords.
pub fn canonical_spelling(kind: TokenKind) -> Option<&'static str> {
    KEYWORDS
        .iter()
        .find(|(_, k)| *k == kind)
        .map(|(spelling, _)| *spelling)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_and_match_agree() {
        for (spelling, kind) in KEYWORDS {
            assert_eq!(keyword_kind(spelling), Some(*kind), "spelling {}", spelling);
        }
    }

    #[test]
    fn test_alternate_spellings() {
        assert_eq!(keyword_kind("защищённый"), keyword_kind("защищенный"));
        assert_eq!(keyword_kind("по_умолчанию"), Some(TokenKind::Default));
        assert_eq!(canonical_spelling(TokenKind::Const), Some("конст"));
        assert_eq!(keyword_kind("переменная_x"), None);
    }
}
