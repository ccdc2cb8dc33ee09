use super::Token;

impl Token {
    /// True for tokens that can continue an expression as a binary
    /// operator. `and then` / `or else` and `not in` are spelled with
    /// two tokens; the parser handles the second word.
    pub fn is_binary_operator(&self) -> bool {
        match self {
            // logical
            Token::And
            | Token::Or
            | Token::Xor
            // relational and membership
            | Token::Equal
            | Token::NotEqual
            | Token::LessThan
            | Token::LessThanOrEq
            | Token::GreaterThan
            | Token::GreaterThanOrEq
            | Token::In
            // adding
            | Token::Add
            | Token::Neg
            | Token::Ampersand
            // multiplying
            | Token::Mul
            | Token::Div
            | Token::Mod
            | Token::Rem
            // highest
            | Token::StarStar => true,
            _ => false,
        }
    }

    /// Operator precedence per the Ada reference manual. Higher binds
    /// tighter. Non-operators are 0.
    pub fn precedence(&self) -> usize {
        match self {
            Token::And | Token::Or | Token::Xor => 10,
            Token::Equal
            | Token::NotEqual
            | Token::LessThan
            | Token::LessThanOrEq
            | Token::GreaterThan
            | Token::GreaterThanOrEq
            | Token::In => 20,
            Token::Add | Token::Neg | Token::Ampersand => 30,
            Token::Mul | Token::Div | Token::Mod | Token::Rem => 40,
            Token::StarStar => 50,
            _ => 0,
        }
    }

    /// True for the tokens that may open a primary expression.
    pub fn can_start_expression(&self) -> bool {
        matches!(
            self,
            Token::Identifier
                | Token::ConstantInt
                | Token::ConstantReal
                | Token::ConstantChar
                | Token::ConstantString
                | Token::LeftParenthesis
                | Token::New
                | Token::Not
                | Token::Abs
                | Token::Null
                | Token::Add
                | Token::Neg
        )
    }
}
