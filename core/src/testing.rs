use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream, StringFormat};

const FONT_SIZE: i64 = 10;
const TOP: i64 = 800;
const LINE_SPACING: i64 = 16;
const LEFT: i64 = 40;
const COLUMN_SPACING: i64 = 180;

/// One SISCAN exam page; defaults describe a routine exam
#[derive(Debug, Clone)]
pub struct ExamFixture {
    emission: String,
    facility: String,
    cnes: String,
    name: String,
    cns: String,
    birth_date: String,
    mother: String,
    density: (String, String),
    birads: (String, String),
    recommendation: String,
    narrative: Option<Vec<String>>,
}

impl Default for ExamFixture {
    fn default() -> Self {
        Self {
            emission: "15/03/2024".to_string(),
            facility: "UBS CENTRAL".to_string(),
            cnes: "2384299".to_string(),
            name: "MARIA DA SILVA".to_string(),
            cns: "898 0012 3456 7890".to_string(),
            birth_date: "10/05/1970".to_string(),
            mother: "JOSEFA DA SILVA".to_string(),
            density: ("Adiposa".to_string(), "Adiposa".to_string()),
            birads: ("2".to_string(), "1".to_string()),
            recommendation: "Controle radiológico de rotina".to_string(),
            narrative: None,
        }
    }
}

impl ExamFixture {
    pub fn name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn cns(mut self, cns: &str) -> Self {
        self.cns = cns.to_string();
        self
    }

    pub fn cnes(mut self, cnes: &str) -> Self {
        self.cnes = cnes.to_string();
        self
    }

    pub fn birth_date(mut self, date: &str) -> Self {
        self.birth_date = date.to_string();
        self
    }

    pub fn emission(mut self, date: &str) -> Self {
        self.emission = date.to_string();
        self
    }

    pub fn birads(mut self, right: &str, left: &str) -> Self {
        self.birads = (right.to_string(), left.to_string());
        self
    }

    pub fn density(mut self, right: &str, left: &str) -> Self {
        self.density = (right.to_string(), left.to_string());
        self
    }

    pub fn recommendation(mut self, text: &str) -> Self {
        self.recommendation = text.to_string();
        self
    }

    /// Replaces everything under RESULTADO EXAME
    pub fn narrative(mut self, lines: &[&str]) -> Self {
        self.narrative = Some(lines.iter().map(|l| l.to_string()).collect());
        self
    }

    fn lines(&self) -> Vec<Vec<String>> {
        let one = |s: &str| vec![s.to_string()];
        let mut lines = vec![
            one("SISCAN - Sistema de informação do Câncer"),
            one("LAUDO DO EXAME DE MAMOGRAFIA"),
            vec![
                format!("Emissão: {}", self.emission),
                "Hora: 10:22".to_string(),
                "Página: 1/1".to_string(),
            ],
            one("UNIDADE DE SAÚDE"),
            vec![
                format!("Nome: {}", self.facility),
                format!("CNES: {}", self.cnes),
            ],
            vec!["Município: RECIFE".to_string(), "UF: PE".to_string()],
            one("PACIENTE"),
            vec![format!("Nome: {}", self.name)],
            vec![format!("Cartão SUS: {}", self.cns), "Sexo: F".to_string()],
            vec![
                format!("Data do Nascimento: {}", self.birth_date),
                "Idade: 53 anos".to_string(),
            ],
            vec![format!("Mãe: {}", self.mother)],
            one("PRESTADOR DE SERVIÇO"),
            vec!["Nome: CLINICA IMAGEM".to_string(), "CNES: 7654321".to_string()],
            one("RESULTADO EXAME"),
        ];

        match &self.narrative {
            Some(narrative) => lines.extend(narrative.iter().map(|l| one(l))),
            None => lines.extend([
                one("MAMA DIREITA"),
                vec![format!("Tipo de mama: {}", self.density.0)],
                one("MAMA ESQUERDA"),
                vec![format!("Tipo de mama: {}", self.density.1)],
                one("CLASSIFICAÇÃO RADIOLÓGICA"),
                vec![format!("Mama direita: Categoria {}", self.birads.0)],
                vec![format!("Mama esquerda: Categoria {}", self.birads.1)],
                one("RECOMENDAÇÕES"),
                vec![self.recommendation.clone()],
            ]),
        }

        lines.push(one("RESPONSÁVEL PELO RESULTADO"));
        lines.push(one("Dr. João Pereira CRM 12345"));
        lines
    }
}

/// Builds a multi-page report export
#[derive(Debug, Clone, Default)]
pub struct ReportFixture {
    pages: Vec<Vec<Vec<String>>>,
}

impl ReportFixture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn exam(mut self, exam: ExamFixture) -> Self {
        self.pages.push(exam.lines());
        self
    }

    /// Page of single-segment lines
    pub fn page(mut self, lines: &[&str]) -> Self {
        self.pages
            .push(lines.iter().map(|l| vec![l.to_string()]).collect());
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "Encoding" => "WinAnsiEncoding",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! {
                "F1" => font_id,
            },
        });

        let mut kids: Vec<Object> = Vec::new();
        for page in &self.pages {
            let content = Content {
                operations: page_operations(page),
            };
            let content_id = doc.add_object(Stream::new(
                dictionary! {},
                content.encode().expect("encode content"),
            ));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(page_id.into());
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
                "Resources" => resources_id,
                "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).expect("save fixture");
        bytes
    }
}

fn latin1(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
        .collect()
}

fn page_operations(lines: &[Vec<String>]) -> Vec<Operation> {
    let mut ops = vec![
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec!["F1".into(), FONT_SIZE.into()]),
    ];
    for (i, segments) in lines.iter().enumerate() {
        let y = TOP - LINE_SPACING * i as i64;
        for (j, segment) in segments.iter().enumerate() {
            let x = LEFT + COLUMN_SPACING * j as i64;
            ops.push(Operation::new(
                "Tm",
                vec![1.into(), 0.into(), 0.into(), 1.into(), x.into(), y.into()],
            ));
            ops.push(Operation::new(
                "Tj",
                vec![Object::String(latin1(segment), StringFormat::Literal)],
            ));
        }
    }
    ops.push(Operation::new("ET", vec![]));
    ops
}
