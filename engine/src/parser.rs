//! Parse-tree builder based on the operator-precedence (two-stack) algorithm.

use nom::{bytes::complete::take_while, Slice};

use crate::{
    error::{Error, ErrorKind, ScanError},
    registry::{Associativity, Fixity, Grouping, OperatorRef, ScannedOperator, TokenSet},
    spans::{unite_spans, InputSpan, MaybeSpanned},
    tree::{Expr, SpannedExpr},
};

/// Number of trailing input chars reported in [`ErrorKind::DanglingTokens`].
const DANGLING_TAIL_LEN: usize = 5;

/// Scanning state passed to token descriptors.
#[derive(Debug, Clone, Copy)]
pub struct Scanner<'t> {
    tokens: &'t TokenSet,
    grouping: Grouping,
    last_skipped: Option<char>,
}

impl<'t> Scanner<'t> {
    #[cfg(test)]
    pub(crate) fn for_tests(tokens: &'t TokenSet) -> Self {
        Self {
            tokens,
            grouping: Grouping::Top,
            last_skipped: None,
        }
    }

    /// Returns the grouping the builder is working in.
    pub fn grouping(&self) -> Grouping {
        self.grouping
    }

    /// Returns the last whitespace char skipped before the current token, if any.
    pub fn last_skipped(&self) -> Option<char> {
        self.last_skipped
    }

    /// Returns the token set used by the builder.
    pub fn tokens(&self) -> &'t TokenSet {
        self.tokens
    }

    /// Builds a tree for the complete `input`, e.g., contents of a bracketed group.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is not a valid expression.
    pub fn build_tree<'a>(
        &self,
        input: InputSpan<'a>,
        grouping: Grouping,
    ) -> Result<SpannedExpr, ScanError<'a>> {
        TreeBuilder::new(self.tokens, grouping).build(input)
    }
}

/// Operator waiting on the stack for its operands.
#[derive(Debug)]
struct Pending {
    op: OperatorRef,
    span: MaybeSpanned<'static>,
}

#[derive(Debug)]
struct TreeBuilder<'t> {
    tokens: &'t TokenSet,
    grouping: Grouping,
    operands: Vec<SpannedExpr>,
    operators: Vec<Pending>,
    max_level: i32,
}

impl<'t> TreeBuilder<'t> {
    fn new(tokens: &'t TokenSet, grouping: Grouping) -> Self {
        Self {
            tokens,
            grouping,
            operands: vec![],
            operators: vec![],
            max_level: i32::MIN,
        }
    }

    fn build<'a>(mut self, input: InputSpan<'a>) -> Result<SpannedExpr, ScanError<'a>> {
        let full_input = input;
        let mut input = input;
        let mut expect_operand = true;

        loop {
            let (rest, last_skipped) = skip_whitespace(input);
            input = rest;
            if input.fragment().is_empty() {
                break;
            }

            let scanner = Scanner {
                tokens: self.tokens,
                grouping: self.grouping,
                last_skipped,
            };
            if expect_operand {
                if let Some((rest, scanned)) = self.tokens.find_prefix_operator(input, &scanner)? {
                    tracing::trace!(symbol = scanned.op.symbol(), "shifted prefix operator");
                    self.max_level = scanned.op.level();
                    self.operators.push(Pending {
                        op: scanned.op,
                        span: scanned.span,
                    });
                    input = rest;
                    continue;
                }

                let (rest, expr) = self.tokens.find_expression(input, &scanner)?;
                tracing::trace!(expr = %expr.extra, "shifted operand");
                self.operands.push(expr);
                expect_operand = false;
                input = rest;
            } else {
                let (rest, scanned) = self.tokens.find_operator(input, &scanner)?;
                if scanned.op.expects_right_operand() {
                    self.push_infix(scanned, input)?;
                    expect_operand = true;
                } else {
                    self.apply_postfix(scanned, input)?;
                }
                input = rest;
            }
        }

        let infix_count = self
            .operators
            .iter()
            .filter(|pending| pending.op.fixity() != Fixity::Prefix)
            .count();
        if self.operands.is_empty() && self.operators.is_empty() {
            return Err(ScanError::new(full_input, ErrorKind::NoExpressionMatched));
        }
        if expect_operand || self.operands.len() != infix_count + 1 {
            return Err(dangling_tokens(full_input));
        }

        while !self.operators.is_empty() {
            self.reduce(full_input)?;
        }
        self.operands.pop().ok_or_else(|| dangling_tokens(full_input))
    }

    /// Pushes an infix operator onto the stack, reducing pending operators if necessary.
    fn push_infix<'a>(
        &mut self,
        scanned: ScannedOperator,
        input: InputSpan<'a>,
    ) -> Result<(), ScanError<'a>> {
        let level = scanned.op.level();
        let left_to_right = scanned.op.associativity() == Associativity::LeftToRight;
        let shifts = if left_to_right {
            level > self.max_level
        } else {
            level >= self.max_level
        };

        if !shifts {
            while let Some(top) = self.operators.last() {
                let top_level = top.op.level();
                let top_binds_tighter = top_level > level || (top_level == level && left_to_right);
                if !top_binds_tighter {
                    break;
                }
                self.reduce(input)?;
            }
        }

        tracing::trace!(symbol = scanned.op.symbol(), level, "shifted infix operator");
        self.max_level = level;
        self.operators.push(Pending {
            op: scanned.op,
            span: scanned.span,
        });
        Ok(())
    }

    /// Wraps the last operand into a postfix operator application. Pending operators
    /// binding tighter than the postfix operator are reduced first.
    fn apply_postfix<'a>(
        &mut self,
        scanned: ScannedOperator,
        input: InputSpan<'a>,
    ) -> Result<(), ScanError<'a>> {
        let level = scanned.op.level();
        while let Some(top) = self.operators.last() {
            if top.op.level() <= level {
                break;
            }
            self.reduce(input)?;
        }

        let operand = self.operands.pop().ok_or_else(|| dangling_tokens(input))?;
        let span = unite_spans(&operand, &scanned.span);
        tracing::trace!(symbol = scanned.op.symbol(), "applied postfix operator");
        self.operands.push(span.copy_with_extra(Expr::Unary {
            op: scanned.op,
            operand: Box::new(operand),
        }));
        Ok(())
    }

    /// Pops the topmost pending operator together with its operand(s) and pushes
    /// the resulting node onto the operand stack.
    fn reduce<'a>(&mut self, input: InputSpan<'a>) -> Result<(), ScanError<'a>> {
        let Pending { op, span } = self.operators.pop().ok_or_else(|| dangling_tokens(input))?;
        let expr = if op.fixity() == Fixity::Prefix {
            let operand = self.operands.pop().ok_or_else(|| dangling_tokens(input))?;
            let span = unite_spans(&span, &operand);
            span.copy_with_extra(Expr::Unary {
                op,
                operand: Box::new(operand),
            })
        } else {
            let rhs = self.operands.pop().ok_or_else(|| dangling_tokens(input))?;
            let lhs = self.operands.pop().ok_or_else(|| dangling_tokens(input))?;
            let span = unite_spans(&lhs, &rhs);
            span.copy_with_extra(Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            })
        };
        tracing::trace!(expr = %expr.extra, "reduced");
        self.operands.push(expr);
        Ok(())
    }
}

fn skip_whitespace(input: InputSpan<'_>) -> (InputSpan<'_>, Option<char>) {
    let parsed: nom::IResult<_, _, ()> = take_while(char::is_whitespace)(input);
    match parsed {
        Ok((rest, skipped)) => (rest, skipped.fragment().chars().next_back()),
        Err(_) => (input, None),
    }
}

fn dangling_tokens(input: InputSpan<'_>) -> ScanError<'_> {
    let code = input.fragment().trim_end();
    let tail_start = code
        .char_indices()
        .rev()
        .nth(DANGLING_TAIL_LEN - 1)
        .map_or(0, |(i, _)| i);
    let tail = code[tail_start..].to_owned();
    ScanError::new(
        input.slice(code.len()..),
        ErrorKind::DanglingTokens { tail },
    )
}

impl TokenSet {
    /// Builds an expression tree for the complete `input`.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is not a valid expression. Possible error kinds
    /// include [`ErrorKind::NoExpressionMatched`], [`ErrorKind::NoOperatorMatched`]
    /// and [`ErrorKind::DanglingTokens`].
    pub fn build_tree(&self, input: &str) -> Result<SpannedExpr, Error> {
        TreeBuilder::new(self, Grouping::Top)
            .build(InputSpan::new(input))
            .map_err(ScanError::into_error)
    }
}
