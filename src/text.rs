use crate::instruction::{Instruction, Repeat};
use crate::opcode::{Emulated, Opcode};
use crate::operand::Operand;
use crate::register::Register;

const MIN_MNEMONIC: usize = 9;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Instruction,
    Text,
    Register,
    Integer(u64),
    PossibleAddress(u64),
    CodeRelativeAddress(u64),
    OperandSeparator,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>) -> Self {
        Token {
            kind,
            text: text.into(),
        }
    }
}

/// Concatenated token text.
pub fn render(tokens: &[Token]) -> String {
    tokens.iter().map(|t| t.text.as_str()).collect()
}

pub fn generate_tokens(inst: &Instruction) -> Vec<Token> {
    let mut res = Vec::new();

    if let Some(ext) = inst.extension().filter(|ext| ext.is_repeated()) {
        let count = match ext.repeat {
            Repeat::Count(n) => format!("#{}", n),
            Repeat::Register(r) => r.name().into_owned(),
        };
        res.push(Token::new(TokenKind::Text, format!("rpt {} {{ ", count)));
    }

    let mnemonic = inst.mnemonic();
    res.push(Token::new(TokenKind::Instruction, mnemonic.clone()));

    if let Some(target) = inst.jump_target() {
        push_padding(&mut res, &mnemonic);
        res.push(Token::new(
            TokenKind::CodeRelativeAddress(target),
            format!("{:#x}", target),
        ));
        return res;
    }

    let operands = inst.displayed_operands();
    if operands.is_empty() {
        return res;
    }
    push_padding(&mut res, &mnemonic);

    let code = is_control_transfer(inst);
    for (i, operand) in operands.iter().enumerate() {
        if i > 0 {
            res.push(Token::new(TokenKind::OperandSeparator, ", "));
        }
        res.extend(generate_operand_tokens(operand, code));
    }

    res
}

fn push_padding(res: &mut Vec<Token>, mnemonic: &str) {
    if mnemonic.len() < MIN_MNEMONIC {
        let padding = " ".repeat(MIN_MNEMONIC - mnemonic.len());
        res.push(Token::new(TokenKind::Text, padding));
    }
}

/// Operands that name code rather than data.
fn is_control_transfer(inst: &Instruction) -> bool {
    matches!(inst.opcode(), Opcode::Call | Opcode::Calla)
        || matches!(inst.emulated(), Some(Emulated::Br | Emulated::Bra))
}

fn signed_hex(value: i64) -> String {
    if value >= 0 {
        format!("{:#x}", value)
    } else {
        format!("-{:#x}", -value)
    }
}

fn register_token(register: Register) -> Token {
    Token::new(TokenKind::Register, register.name())
}

fn address_token(address: u64, code: bool) -> Token {
    let kind = if code {
        TokenKind::CodeRelativeAddress(address)
    } else {
        TokenKind::PossibleAddress(address)
    };
    Token::new(kind, format!("{:#x}", address))
}

fn generate_operand_tokens(operand: &Operand, code: bool) -> Vec<Token> {
    match *operand {
        Operand::RegisterDirect(r) => vec![register_token(r)],
        Operand::Indexed { register, offset } => vec![
            Token::new(TokenKind::Integer(offset as i64 as u64), signed_hex(offset as i64)),
            Token::new(TokenKind::Text, "("),
            register_token(register),
            Token::new(TokenKind::Text, ")"),
        ],
        Operand::RegisterIndirect(r) => vec![Token::new(TokenKind::Text, "@"), register_token(r)],
        Operand::RegisterIndirectAutoIncrement { register, .. } => vec![
            Token::new(TokenKind::Text, "@"),
            register_token(register),
            Token::new(TokenKind::Text, "+"),
        ],
        Operand::Symbolic { .. } => {
            let target = operand.memory_address().unwrap_or_default();
            vec![Token::new(
                TokenKind::CodeRelativeAddress(target),
                format!("{:#x}", target),
            )]
        }
        Operand::Immediate(value) => vec![
            Token::new(TokenKind::Text, "#"),
            address_token(value as u64, code),
        ],
        Operand::Absolute(address) => vec![
            Token::new(TokenKind::Text, "&"),
            address_token(address as u64, code),
        ],
        Operand::Constant(value) => vec![
            Token::new(TokenKind::Text, "#"),
            Token::new(TokenKind::Integer(value as i64 as u64), signed_hex(value as i64)),
        ],
    }
}
