use log::debug;

/// Parsed doc-comment annotation directives for one handler.
///
/// Directives are line-oriented: each doc line either starts with a known
/// `@Directive` or is ignored. Malformed directive lines are skipped so a
/// typo never blocks the rest of the annotation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Annotation {
    pub summary: Option<String>,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub accept: Option<String>,
    pub produce: Option<String>,
    pub security: Vec<String>,
    pub params: Vec<ParamAnnotation>,
    pub responses: Vec<ResponseAnnotation>,
}

/// `@Param name location type required "description"`.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamAnnotation {
    pub name: String,
    pub location: ParamLocation,
    pub type_name: String,
    pub required: bool,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamLocation {
    Path,
    Query,
    Header,
    Body,
}

impl ParamLocation {
    fn parse(s: &str) -> Option<ParamLocation> {
        match s {
            "path" => Some(ParamLocation::Path),
            "query" => Some(ParamLocation::Query),
            "header" => Some(ParamLocation::Header),
            "body" => Some(ParamLocation::Body),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ParamLocation::Path => "path",
            ParamLocation::Query => "query",
            ParamLocation::Header => "header",
            ParamLocation::Body => "body",
        }
    }
}

/// `@Success` / `@Failure` directive:
/// `@Success 200 {object} models::Menu "description"`.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseAnnotation {
    pub code: u16,
    pub success: bool,
    pub wrapper: Option<PayloadWrapper>,
    pub type_name: Option<String>,
    pub description: Option<String>,
}

/// The payload marker of a response directive: `{object}` wraps the type in
/// the standard response envelope, `{array}` wraps a list of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadWrapper {
    Object,
    Array,
}

impl Annotation {
    /// Parses annotation directives out of raw doc-comment lines.
    ///
    /// Returns `None` when no line carries a recognized directive, so
    /// ordinary doc comments cost nothing.
    pub fn parse(doc_lines: &[String]) -> Option<Annotation> {
        let mut annotation = Annotation::default();
        let mut found_any = false;

        for line in doc_lines {
            let line = line.trim();
            if !line.starts_with('@') {
                continue;
            }
            let (directive, rest) = match line.split_once(char::is_whitespace) {
                Some((d, r)) => (d, r.trim()),
                None => (line, ""),
            };

            match directive {
                "@Summary" => {
                    annotation.summary = Some(rest.to_string());
                    found_any = true;
                }
                "@Description" => {
                    // multiple @Description lines accumulate
                    match &mut annotation.description {
                        Some(existing) => {
                            existing.push('\n');
                            existing.push_str(rest);
                        }
                        None => annotation.description = Some(rest.to_string()),
                    }
                    found_any = true;
                }
                "@Tags" => {
                    annotation.tags = rest
                        .split(',')
                        .map(|t| t.trim().to_string())
                        .filter(|t| !t.is_empty())
                        .collect();
                    found_any = true;
                }
                "@Accept" => {
                    annotation.accept = Some(mime_for(rest));
                    found_any = true;
                }
                "@Produce" => {
                    annotation.produce = Some(mime_for(rest));
                    found_any = true;
                }
                "@Security" => {
                    if !rest.is_empty() {
                        annotation.security.push(rest.to_string());
                        found_any = true;
                    }
                }
                "@Param" => match parse_param(rest) {
                    Some(param) => {
                        annotation.params.push(param);
                        found_any = true;
                    }
                    None => debug!("Skipping malformed @Param directive: {}", line),
                },
                "@Success" | "@Failure" => {
                    match parse_response(rest, directive == "@Success") {
                        Some(response) => {
                            annotation.responses.push(response);
                            found_any = true;
                        }
                        None => debug!("Skipping malformed response directive: {}", line),
                    }
                }
                _ => debug!("Ignoring unrecognized directive: {}", directive),
            }
        }

        if found_any {
            Some(annotation)
        } else {
            None
        }
    }
}

/// `name location type required "description"`.
fn parse_param(rest: &str) -> Option<ParamAnnotation> {
    let (head, description) = split_quoted_tail(rest);
    let mut parts = head.split_whitespace();

    let name = parts.next()?.to_string();
    let location = ParamLocation::parse(parts.next()?)?;
    let type_name = parts.next()?.to_string();
    let required = match parts.next() {
        Some("true") => true,
        Some("false") => false,
        _ => return None,
    };

    Some(ParamAnnotation {
        name,
        location,
        type_name,
        required,
        description,
    })
}

/// `code [{object}|{array}] [Type] ["description"]`.
fn parse_response(rest: &str, success: bool) -> Option<ResponseAnnotation> {
    let (head, description) = split_quoted_tail(rest);
    let mut parts = head.split_whitespace().peekable();

    let code: u16 = parts.next()?.parse().ok()?;

    let wrapper = match parts.peek() {
        Some(&"{object}") => {
            parts.next();
            Some(PayloadWrapper::Object)
        }
        Some(&"{array}") => {
            parts.next();
            Some(PayloadWrapper::Array)
        }
        _ => None,
    };

    let type_name = parts.next().map(|t| t.to_string());

    Some(ResponseAnnotation {
        code,
        success,
        wrapper,
        type_name,
        description,
    })
}

/// Splits a directive tail into its unquoted head and the trailing quoted
/// description, if any.
fn split_quoted_tail(rest: &str) -> (&str, Option<String>) {
    if let Some(start) = rest.find('"') {
        let tail = &rest[start + 1..];
        let description = tail.strip_suffix('"').unwrap_or(tail);
        (rest[..start].trim_end(), Some(description.to_string()))
    } else {
        (rest, None)
    }
}

/// Expands common media-type shorthands; anything containing a slash passes
/// through unchanged.
fn mime_for(name: &str) -> String {
    match name {
        "json" => "application/json".to_string(),
        "xml" => "application/xml".to_string(),
        "plain" => "text/plain".to_string(),
        "html" => "text/html".to_string(),
        "mpfd" | "multipart" => "multipart/form-data".to_string(),
        "x-www-form-urlencoded" => "application/x-www-form-urlencoded".to_string(),
        other => other.to_string(),
    }
}
