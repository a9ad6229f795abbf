//! Type Expression Builder
//!
//! Fluent value assembled by the parser for each schema node and rendered to
//! a zod-style combinator expression by the module generator. Cross-document
//! references are a dedicated variant so the orchestrator can wrap them in a
//! deferred thunk when the edge closes an import cycle.

use serde_json::Value;

/// The shape part of a builder, before modifiers
#[derive(Debug, Clone, PartialEq)]
pub enum TypeExpr {
    Any,
    Never,
    String,
    Number,
    Integer,
    Boolean,
    Null,
    Literal(Value),
    EnumOf(Vec<String>),
    Array(Box<Builder>),
    Tuple(Vec<Builder>),
    Object {
        fields: Vec<(String, Builder)>,
        catchall: Option<Box<Builder>>,
    },
    Record(Box<Builder>),
    Union(Vec<Builder>),
    Intersection(Vec<Builder>),
    /// A named binding: another module's export, or this module's own export
    /// for a self reference. `lazy` defers resolution to use-time.
    Reference { binding: String, lazy: bool },
}

/// A renderable type expression with fluent modifiers
#[derive(Debug, Clone, PartialEq)]
pub struct Builder {
    expr: TypeExpr,
    optional: bool,
    nullable: bool,
    description: Option<String>,
    default: Option<Value>,
    /// Extra rendered checks such as `min(1)` or `max(10)`
    checks: Vec<String>,
}

impl Builder {
    fn from_expr(expr: TypeExpr) -> Self {
        Self {
            expr,
            optional: false,
            nullable: false,
            description: None,
            default: None,
            checks: Vec::new(),
        }
    }

    pub fn any() -> Self {
        Self::from_expr(TypeExpr::Any)
    }

    pub fn never() -> Self {
        Self::from_expr(TypeExpr::Never)
    }

    pub fn string() -> Self {
        Self::from_expr(TypeExpr::String)
    }

    pub fn number() -> Self {
        Self::from_expr(TypeExpr::Number)
    }

    pub fn integer() -> Self {
        Self::from_expr(TypeExpr::Integer)
    }

    pub fn boolean() -> Self {
        Self::from_expr(TypeExpr::Boolean)
    }

    pub fn null() -> Self {
        Self::from_expr(TypeExpr::Null)
    }

    pub fn literal(value: Value) -> Self {
        Self::from_expr(TypeExpr::Literal(value))
    }

    pub fn enum_of(values: Vec<String>) -> Self {
        Self::from_expr(TypeExpr::EnumOf(values))
    }

    pub fn array(items: Builder) -> Self {
        Self::from_expr(TypeExpr::Array(Box::new(items)))
    }

    pub fn tuple(items: Vec<Builder>) -> Self {
        Self::from_expr(TypeExpr::Tuple(items))
    }

    pub fn object(fields: Vec<(String, Builder)>) -> Self {
        Self::from_expr(TypeExpr::Object {
            fields,
            catchall: None,
        })
    }

    pub fn object_with_catchall(fields: Vec<(String, Builder)>, catchall: Builder) -> Self {
        Self::from_expr(TypeExpr::Object {
            fields,
            catchall: Some(Box::new(catchall)),
        })
    }

    pub fn record(values: Builder) -> Self {
        Self::from_expr(TypeExpr::Record(Box::new(values)))
    }

    pub fn union(variants: Vec<Builder>) -> Self {
        match variants.len() {
            0 => Self::any(),
            1 => variants.into_iter().next().unwrap(),
            _ => Self::from_expr(TypeExpr::Union(variants)),
        }
    }

    pub fn intersection(parts: Vec<Builder>) -> Self {
        match parts.len() {
            0 => Self::any(),
            1 => parts.into_iter().next().unwrap(),
            _ => Self::from_expr(TypeExpr::Intersection(parts)),
        }
    }

    /// Reference to a named binding, deferred when `lazy`
    pub fn reference(binding: impl Into<String>, lazy: bool) -> Self {
        Self::from_expr(TypeExpr::Reference {
            binding: binding.into(),
            lazy,
        })
    }

    // --- fluent modifiers ---

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn describe(mut self, text: impl Into<String>) -> Self {
        self.description = Some(text.into());
        self
    }

    pub fn default_value(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    pub fn check(mut self, rendered: impl Into<String>) -> Self {
        self.checks.push(rendered.into());
        self
    }

    pub fn is_optional(&self) -> bool {
        self.optional
    }

    pub fn expr(&self) -> &TypeExpr {
        &self.expr
    }

    /// Whether this builder (or a nested one) renders a lazy reference
    pub fn is_lazy_reference(&self) -> bool {
        matches!(self.expr, TypeExpr::Reference { lazy: true, .. })
    }

    /// Render the expression to source text
    pub fn render(&self) -> String {
        let mut out = self.render_expr();

        for check in &self.checks {
            out.push('.');
            out.push_str(check);
        }
        if let Some(description) = &self.description {
            out.push_str(&format!(
                ".describe({})",
                Value::String(description.clone())
            ));
        }
        if let Some(default) = &self.default {
            out.push_str(&format!(".default({})", default));
        }
        if self.nullable {
            out.push_str(".nullable()");
        }
        if self.optional {
            out.push_str(".optional()");
        }

        out
    }

    fn render_expr(&self) -> String {
        match &self.expr {
            TypeExpr::Any => "z.any()".to_string(),
            TypeExpr::Never => "z.never()".to_string(),
            TypeExpr::String => "z.string()".to_string(),
            TypeExpr::Number => "z.number()".to_string(),
            TypeExpr::Integer => "z.number().int()".to_string(),
            TypeExpr::Boolean => "z.boolean()".to_string(),
            TypeExpr::Null => "z.null()".to_string(),
            TypeExpr::Literal(value) => format!("z.literal({})", value),
            TypeExpr::EnumOf(values) => {
                let list = values
                    .iter()
                    .map(|v| Value::String(v.clone()).to_string())
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("z.enum([{}])", list)
            }
            TypeExpr::Array(items) => format!("z.array({})", items.render()),
            TypeExpr::Tuple(items) => {
                let list = items.iter().map(Builder::render).collect::<Vec<_>>().join(", ");
                format!("z.tuple([{}])", list)
            }
            TypeExpr::Object { fields, catchall } => {
                let mut out = if fields.is_empty() {
                    String::from("z.object({})")
                } else {
                    let rendered: Vec<String> = fields
                        .iter()
                        .map(|(name, field)| format!("{}: {}", object_key(name), field.render()))
                        .collect();
                    format!("z.object({{ {} }})", rendered.join(", "))
                };
                if let Some(catchall) = catchall {
                    out.push_str(&format!(".catchall({})", catchall.render()));
                }
                out
            }
            TypeExpr::Record(values) => format!("z.record({})", values.render()),
            TypeExpr::Union(variants) => {
                let list = variants.iter().map(Builder::render).collect::<Vec<_>>().join(", ");
                format!("z.union([{}])", list)
            }
            TypeExpr::Intersection(parts) => {
                // z.intersection is binary; fold right for n-ary allOf
                let mut iter = parts.iter().rev().map(Builder::render);
                let mut acc = iter.next().unwrap_or_else(|| "z.any()".to_string());
                for part in iter {
                    acc = format!("z.intersection({}, {})", part, acc);
                }
                acc
            }
            TypeExpr::Reference { binding, lazy } => {
                if *lazy {
                    format!("z.lazy(() => {})", binding)
                } else {
                    binding.clone()
                }
            }
        }
    }
}

/// Quote an object key unless it is a plain identifier
fn object_key(name: &str) -> String {
    let mut chars = name.chars();
    let plain = match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' || first == '$' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
        }
        _ => false,
    };

    if plain {
        name.to_string()
    } else {
        Value::String(name.to_string()).to_string()
    }
}
