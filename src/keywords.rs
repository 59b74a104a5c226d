//! Static keyword and class-name tables.
//!
//! Both tables are sorted by spelling and searched with a binary search.
//! A lowercase word is looked up as a keyword first and as a class name
//! second; anything else is a plain identifier.

use crate::types::{Compass, Direction, Edge};

/// Built-in functions callable from expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    Abs,
    Cos,
    Int,
    Max,
    Min,
    Sin,
    Sqrt,
}

impl Function {
    pub fn arity(self) -> usize {
        match self {
            Function::Max | Function::Min => 2,
            _ => 1,
        }
    }
}

/// Reserved words of the language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    Above,
    Aligned,
    And,
    As,
    Assert,
    At,
    Behind,
    Below,
    Between,
    Big,
    Bold,
    Bottom,
    Ccw,
    Center,
    Chop,
    Close,
    Color,
    Cw,
    Dashed,
    Define,
    Diameter,
    Dir(Direction),
    Dist,
    Dotted,
    EdgePt(Compass),
    End,
    Even,
    Fill,
    First,
    Fit,
    From,
    Func(Function),
    Go,
    Heading,
    Height,
    In,
    Invis,
    Italic,
    Last,
    Ljust,
    Mono,
    Of,
    On,
    Print,
    Radius,
    Rjust,
    Same,
    Small,
    Solid,
    Start,
    The,
    Then,
    Thick,
    Thickness,
    Thin,
    This,
    To,
    Top,
    Until,
    Vertex,
    Way,
    Width,
    With,
    X,
    Y,
}

impl Keyword {
    /// The edge this keyword names when used after a dot or before `of`.
    pub fn edge(self) -> Option<Edge> {
        match self {
            Keyword::EdgePt(c) => Some(Edge::Compass(c)),
            Keyword::Center => Some(Edge::Compass(Compass::C)),
            Keyword::Top => Some(Edge::Compass(Compass::N)),
            Keyword::Bottom => Some(Edge::Compass(Compass::S)),
            Keyword::Dir(Direction::Left) => Some(Edge::Compass(Compass::W)),
            Keyword::Dir(Direction::Right) => Some(Edge::Compass(Compass::E)),
            Keyword::Start => Some(Edge::Start),
            Keyword::End => Some(Edge::End),
            _ => None,
        }
    }
}

static KEYWORDS: &[(&str, Keyword)] = &[
    ("above", Keyword::Above),
    ("abs", Keyword::Func(Function::Abs)),
    ("aligned", Keyword::Aligned),
    ("and", Keyword::And),
    ("as", Keyword::As),
    ("assert", Keyword::Assert),
    ("at", Keyword::At),
    ("behind", Keyword::Behind),
    ("below", Keyword::Below),
    ("between", Keyword::Between),
    ("big", Keyword::Big),
    ("bold", Keyword::Bold),
    ("bot", Keyword::EdgePt(Compass::S)),
    ("bottom", Keyword::Bottom),
    ("c", Keyword::EdgePt(Compass::C)),
    ("ccw", Keyword::Ccw),
    ("center", Keyword::Center),
    ("chop", Keyword::Chop),
    ("close", Keyword::Close),
    ("color", Keyword::Color),
    ("cos", Keyword::Func(Function::Cos)),
    ("cw", Keyword::Cw),
    ("dashed", Keyword::Dashed),
    ("define", Keyword::Define),
    ("diameter", Keyword::Diameter),
    ("dist", Keyword::Dist),
    ("dotted", Keyword::Dotted),
    ("down", Keyword::Dir(Direction::Down)),
    ("e", Keyword::EdgePt(Compass::E)),
    ("east", Keyword::EdgePt(Compass::E)),
    ("end", Keyword::End),
    ("even", Keyword::Even),
    ("fill", Keyword::Fill),
    ("first", Keyword::First),
    ("fit", Keyword::Fit),
    ("from", Keyword::From),
    ("go", Keyword::Go),
    ("heading", Keyword::Heading),
    ("height", Keyword::Height),
    ("ht", Keyword::Height),
    ("in", Keyword::In),
    ("int", Keyword::Func(Function::Int)),
    ("invis", Keyword::Invis),
    ("invisible", Keyword::Invis),
    ("italic", Keyword::Italic),
    ("last", Keyword::Last),
    ("left", Keyword::Dir(Direction::Left)),
    ("ljust", Keyword::Ljust),
    ("max", Keyword::Func(Function::Max)),
    ("min", Keyword::Func(Function::Min)),
    ("mono", Keyword::Mono),
    ("monospace", Keyword::Mono),
    ("n", Keyword::EdgePt(Compass::N)),
    ("ne", Keyword::EdgePt(Compass::NE)),
    ("north", Keyword::EdgePt(Compass::N)),
    ("nw", Keyword::EdgePt(Compass::NW)),
    ("of", Keyword::Of),
    ("on", Keyword::On),
    ("previous", Keyword::Last),
    ("print", Keyword::Print),
    ("rad", Keyword::Radius),
    ("radius", Keyword::Radius),
    ("right", Keyword::Dir(Direction::Right)),
    ("rjust", Keyword::Rjust),
    ("s", Keyword::EdgePt(Compass::S)),
    ("same", Keyword::Same),
    ("se", Keyword::EdgePt(Compass::SE)),
    ("sin", Keyword::Func(Function::Sin)),
    ("small", Keyword::Small),
    ("solid", Keyword::Solid),
    ("south", Keyword::EdgePt(Compass::S)),
    ("sqrt", Keyword::Func(Function::Sqrt)),
    ("start", Keyword::Start),
    ("sw", Keyword::EdgePt(Compass::SW)),
    ("t", Keyword::Top),
    ("the", Keyword::The),
    ("then", Keyword::Then),
    ("thick", Keyword::Thick),
    ("thickness", Keyword::Thickness),
    ("thin", Keyword::Thin),
    ("this", Keyword::This),
    ("to", Keyword::To),
    ("top", Keyword::Top),
    ("until", Keyword::Until),
    ("up", Keyword::Dir(Direction::Up)),
    ("vertex", Keyword::Vertex),
    ("w", Keyword::EdgePt(Compass::W)),
    ("way", Keyword::Way),
    ("west", Keyword::EdgePt(Compass::W)),
    ("wid", Keyword::Width),
    ("width", Keyword::Width),
    ("with", Keyword::With),
    ("x", Keyword::X),
    ("y", Keyword::Y),
];

pub fn lookup_keyword(word: &str) -> Option<Keyword> {
    KEYWORDS
        .binary_search_by(|(name, _)| (*name).cmp(word))
        .ok()
        .map(|i| KEYWORDS[i].1)
}

/// The public object classes that may start a statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassName {
    Arc,
    Arrow,
    Box,
    Circle,
    Cylinder,
    Diamond,
    Dot,
    Ellipse,
    File,
    Line,
    Move,
    Oval,
    Spline,
    Text,
}

static CLASS_NAMES: &[(&str, ClassName)] = &[
    ("arc", ClassName::Arc),
    ("arrow", ClassName::Arrow),
    ("box", ClassName::Box),
    ("circle", ClassName::Circle),
    ("cylinder", ClassName::Cylinder),
    ("diamond", ClassName::Diamond),
    ("dot", ClassName::Dot),
    ("ellipse", ClassName::Ellipse),
    ("file", ClassName::File),
    ("line", ClassName::Line),
    ("move", ClassName::Move),
    ("oval", ClassName::Oval),
    ("spline", ClassName::Spline),
    ("text", ClassName::Text),
];

pub fn lookup_class(word: &str) -> Option<ClassName> {
    CLASS_NAMES
        .binary_search_by(|(name, _)| (*name).cmp(word))
        .ok()
        .map(|i| CLASS_NAMES[i].1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tables_are_sorted() {
        assert!(KEYWORDS.windows(2).all(|w| w[0].0 < w[1].0));
        assert!(CLASS_NAMES.windows(2).all(|w| w[0].0 < w[1].0));
    }

    #[test]
    fn synonyms_share_meaning() {
        assert_eq!(lookup_keyword("ht"), lookup_keyword("height"));
        assert_eq!(lookup_keyword("previous"), Some(Keyword::Last));
        assert_eq!(lookup_keyword("invisible"), Some(Keyword::Invis));
        assert_eq!(lookup_keyword("t"), Some(Keyword::Top));
    }

    #[test]
    fn keywords_win_over_classes() {
        assert_eq!(lookup_class("box"), Some(ClassName::Box));
        assert_eq!(lookup_keyword("box"), None);
        assert_eq!(lookup_class("boxes"), None);
    }

    #[test]
    fn edges_of_keywords() {
        assert_eq!(
            lookup_keyword("left").and_then(Keyword::edge),
            Some(Edge::Compass(Compass::W))
        );
        assert_eq!(lookup_keyword("up").and_then(Keyword::edge), None);
        assert_eq!(lookup_keyword("end").and_then(Keyword::edge), Some(Edge::End));
    }
}
