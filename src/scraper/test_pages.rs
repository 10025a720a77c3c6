//! Entry-list pages for tests, shaped like the live site's markup

pub const RACE_ID: &str = "202405040811";
pub const MAIN_URL: &str = "https://race.test/race/shutuba.html?race_id=202405040811";

pub fn jockey_url(n: usize) -> String {
    format!("https://db.test/jockey/result/recent/{:05}/", n)
}

pub fn jockey_page(name: &str) -> String {
    format!(
        "<html><head><title>{} の近走成績 | 競馬データベース</title></head><body></body></html>",
        name
    )
}

pub fn horse_name(n: usize) -> String {
    format!("テストホース{}", n)
}

pub fn header_html() -> String {
    r#"<div class="RaceList_Item02">
  <h1 class="RaceName">テストステークス <span class="Icon_GradeType Icon_GradeType1"></span></h1>
  <div class="RaceData01">15:40発走 /<span> 芝2000m</span> (左 A)
    /<span class="Icon_Weather Weather01"></span>天候:晴<span class="Line">/</span><span class="Item03">馬場:良</span>
  </div>
  <div class="RaceData02">
    <span>4回</span><span>東京</span><span>8日目</span><span>サラ系３歳</span><span>オープン</span>
    <span>(国際)(指)</span><span>馬齢</span><span>18頭</span>
  </div>
</div>"#
        .to_string()
}

fn row_html(n: usize, blank_name: bool) -> String {
    let name = if blank_name {
        String::new()
    } else {
        format!(
            "<a href=\"https://db.test/horse/20211{:05}/\">{}</a>",
            n,
            horse_name(n)
        )
    };
    let change = if n == 3 {
        "(前計不)".to_string()
    } else {
        format!("(+{})", n)
    };

    format!(
        r#"<tr class="HorseList" id="tr_{n}">
  <td class="Waku{waku} Txt_C"><span>{waku}</span></td>
  <td class="Umaban{n} Txt_C">{n}</td>
  <td class="CheckMark Horse_Select"><label></label></td>
  <td class="HorseInfo"><div><div><span class="HorseName">{name}</span></div></div></td>
  <td class="Barei Txt_C">牡3</td>
  <td class="Txt_C">57.0</td>
  <td class="Jockey"><a href="{jockey}" title="騎手{n}">騎手{n}</a></td>
  <td class="Trainer"><span class="Label1">美浦</span><a href="https://db.test/trainer/{n}/">調教師</a></td>
  <td class="Weight">{weight}<small>{change}</small></td>
  <td class="Txt_R Popular"><span id="odds-1_{n}">{odds}.5</span></td>
  <td class="Popular Popular_Ninki Txt_C"><span>{n}</span></td>
</tr>"#,
        n = n,
        waku = (n + 1) / 2,
        name = name,
        jockey = jockey_url(n),
        weight = 480 + n,
        change = change,
        odds = n + 1,
    )
}

/// Builds a full entry-list page
#[derive(Debug, Default)]
pub struct PageBuilder {
    rows: usize,
    blank_names: Vec<usize>,
    replacements: Vec<(usize, String, String)>,
    header: Option<String>,
}

impl PageBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows(mut self, rows: usize) -> Self {
        self.rows = rows;
        self
    }

    /// Leave the name cell of the zero-based row empty
    pub fn blank_name(mut self, row: usize) -> Self {
        self.blank_names.push(row);
        self
    }

    /// Textual replacement inside one zero-based row
    pub fn replace_in_row(mut self, row: usize, from: &str, to: &str) -> Self {
        self.replacements
            .push((row, from.to_string(), to.to_string()));
        self
    }

    pub fn header(mut self, header: String) -> Self {
        self.header = Some(header);
        self
    }

    pub fn build(&self) -> String {
        let rows: String = (0..self.rows)
            .map(|row| {
                let mut html = row_html(row + 1, self.blank_names.contains(&row));
                for (target, from, to) in &self.replacements {
                    if *target == row {
                        html = html.replace(from.as_str(), to);
                    }
                }
                html
            })
            .collect();

        format!(
            r#"<html><head><title>出馬表 | netkeiba</title></head><body>
{header}
<table class="Shutuba_Table RaceTable01"><tbody>
{rows}
</tbody></table>
</body></html>"#,
            header = self.header.clone().unwrap_or_else(header_html),
            rows = rows,
        )
    }
}
