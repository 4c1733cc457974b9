/// Binary operators, fixed at parse time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Assign,
    AddAssign,
    SubAssign,
    MulAssign,
    DivAssign,
    ModAssign,
    Or,
    And,
    BitOr,
    BitXor,
    BitAnd,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Shl,
    Shr,
    /// Logical (unsigned) right shift.
    UShr,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
}

const BINARY: &[(&str, BinaryOp)] = &[
    ("=", BinaryOp::Assign),
    ("+=", BinaryOp::AddAssign),
    ("-=", BinaryOp::SubAssign),
    ("*=", BinaryOp::MulAssign),
    ("/=", BinaryOp::DivAssign),
    ("%=", BinaryOp::ModAssign),
    ("||", BinaryOp::Or),
    ("&&", BinaryOp::And),
    ("|", BinaryOp::BitOr),
    ("^", BinaryOp::BitXor),
    ("&", BinaryOp::BitAnd),
    ("==", BinaryOp::Eq),
    ("!=", BinaryOp::Ne),
    ("<", BinaryOp::Lt),
    ("<=", BinaryOp::Le),
    (">", BinaryOp::Gt),
    (">=", BinaryOp::Ge),
    ("<<", BinaryOp::Shl),
    (">>", BinaryOp::Shr),
    (">>>", BinaryOp::UShr),
    ("+", BinaryOp::Add),
    ("-", BinaryOp::Sub),
    ("*", BinaryOp::Mul),
    ("/", BinaryOp::Div),
    ("%", BinaryOp::Mod),
    ("**", BinaryOp::Pow),
];

impl BinaryOp {
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        BINARY.iter().find(|(s, _)| *s == symbol).map(|(_, op)| *op)
    }

    pub fn symbol(self) -> &'static str {
        BINARY
            .iter()
            .find(|(_, op)| *op == self)
            .map(|(s, _)| *s)
            .unwrap_or("?")
    }

    pub fn is_assignment(self) -> bool {
        matches!(
            self,
            BinaryOp::Assign
                | BinaryOp::AddAssign
                | BinaryOp::SubAssign
                | BinaryOp::MulAssign
                | BinaryOp::DivAssign
                | BinaryOp::ModAssign
        )
    }

    /// `+=` applies `+`, and so on.
    pub fn compound_base(self) -> Option<BinaryOp> {
        match self {
            BinaryOp::AddAssign => Some(BinaryOp::Add),
            BinaryOp::SubAssign => Some(BinaryOp::Sub),
            BinaryOp::MulAssign => Some(BinaryOp::Mul),
            BinaryOp::DivAssign => Some(BinaryOp::Div),
            BinaryOp::ModAssign => Some(BinaryOp::Mod),
            _ => None,
        }
    }

    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge
        )
    }

    pub fn is_logical(self) -> bool {
        matches!(self, BinaryOp::And | BinaryOp::Or)
    }

    pub fn is_bitwise(self) -> bool {
        matches!(
            self,
            BinaryOp::BitOr
                | BinaryOp::BitXor
                | BinaryOp::BitAnd
                | BinaryOp::Shl
                | BinaryOp::Shr
                | BinaryOp::UShr
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Neg,
    Plus,
    Not,
    BitNot,
    PreInc,
    PreDec,
    PostInc,
    PostDec,
}

impl UnaryOp {
    pub fn prefix_from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "-" => Some(UnaryOp::Neg),
            "+" => Some(UnaryOp::Plus),
            "!" => Some(UnaryOp::Not),
            "~" => Some(UnaryOp::BitNot),
            "++" => Some(UnaryOp::PreInc),
            "--" => Some(UnaryOp::PreDec),
            _ => None,
        }
    }

    pub fn postfix_from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "++" => Some(UnaryOp::PostInc),
            "--" => Some(UnaryOp::PostDec),
            _ => None,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Neg => "-",
            UnaryOp::Plus => "+",
            UnaryOp::Not => "!",
            UnaryOp::BitNot => "~",
            UnaryOp::PreInc | UnaryOp::PostInc => "++",
            UnaryOp::PreDec | UnaryOp::PostDec => "--",
        }
    }

    /// Increment and decrement write back to their operand.
    pub fn is_step(self) -> bool {
        matches!(
            self,
            UnaryOp::PreInc | UnaryOp::PreDec | UnaryOp::PostInc | UnaryOp::PostDec
        )
    }

    pub fn is_postfix(self) -> bool {
        matches!(self, UnaryOp::PostInc | UnaryOp::PostDec)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Punct {
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Comma,
    Semi,
    Dot,
    Colon,
}

impl Punct {
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "(" => Some(Punct::LParen),
            ")" => Some(Punct::RParen),
            "[" => Some(Punct::LBracket),
            "]" => Some(Punct::RBracket),
            "{" => Some(Punct::LBrace),
            "}" => Some(Punct::RBrace),
            "," => Some(Punct::Comma),
            ";" => Some(Punct::Semi),
            "." => Some(Punct::Dot),
            ":" => Some(Punct::Colon),
            _ => None,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Punct::LParen => "(",
            Punct::RParen => ")",
            Punct::LBracket => "[",
            Punct::RBracket => "]",
            Punct::LBrace => "{",
            Punct::RBrace => "}",
            Punct::Comma => ",",
            Punct::Semi => ";",
            Punct::Dot => ".",
            Punct::Colon => ":",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbols_round_trip() {
        for (symbol, op) in BINARY {
            assert_eq!(BinaryOp::from_symbol(symbol), Some(*op));
            assert_eq!(op.symbol(), *symbol);
        }
        assert_eq!(BinaryOp::AddAssign.compound_base(), Some(BinaryOp::Add));
        assert_eq!(UnaryOp::postfix_from_symbol("-"), None);
    }
}
