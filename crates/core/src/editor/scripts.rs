//! Page scripts for the script-editor flow. Each is a function expression
//! called through [`Session::eval`](crate::browser::Session::eval).

/// Editor shell has rendered its toolbar.
pub const EDITOR_READY: &str = r#"() => !!document.querySelector(
	'[role="combobox"], select, button[aria-label*="実行"], button[aria-label*="Run"]'
)"#;

/// Picks a native `<select>` option. `exact` requires the option text (or
/// value) to equal the name; otherwise containment is enough.
pub const SELECT_OPTION: &str = r#"({ name, exact }) => {
	for (const select of document.querySelectorAll('select')) {
		const found = Array.from(select.options).find((opt) => {
			const text = (opt.textContent || '').trim();
			return exact ? (text === name || opt.value === name) : text.includes(name);
		});
		if (found) {
			select.value = found.value;
			select.dispatchEvent(new Event('input', { bubbles: true }));
			select.dispatchEvent(new Event('change', { bubbles: true }));
			return true;
		}
	}
	return false;
}"#;

/// Number of generic dropdown triggers on the page.
pub const COUNT_DROPDOWNS: &str = r#"() => document.querySelectorAll('[role="combobox"], [aria-haspopup="listbox"]').length"#;

pub const OPEN_DROPDOWN: &str = r#"(index) => {
	const el = document.querySelectorAll('[role="combobox"], [aria-haspopup="listbox"]')[index];
	if (!el) return false;
	el.click();
	return true;
}"#;

/// Clicks the listbox option containing `name`.
pub const CLICK_OPTION: &str = r#"(name) => {
	const opt = Array.from(document.querySelectorAll('[role="option"]'))
		.find((o) => (o.textContent || '').includes(name));
	if (!opt) return false;
	opt.click();
	return true;
}"#;

pub const CLOSE_DROPDOWN: &str = r#"() => {
	document.dispatchEvent(new KeyboardEvent('keydown', { key: 'Escape', bubbles: true }));
	return true;
}"#;

/// Currently selected function name, when the toolbar exposes it.
pub const SELECTED_FUNCTION: &str = r#"() => {
	for (const select of document.querySelectorAll('select')) {
		if (select.value && select.value.includes('test')) return select.value;
	}
	const combo = document.querySelector('div[aria-label="実行する関数を選択"], [role="combobox"][aria-label*="関数"]');
	return combo ? (combo.textContent || '').trim() : null;
}"#;

/// Scrapes the execution-log text.
///
/// Looks in the log panel first, then in generic log containers, then in any
/// pre/code/textarea. Page-bootstrap script text is never returned.
pub const EXTRACT_LOG: &str = r#"() => {
	const noisy = (t) => t.includes('window.WIZ_global_data') || t.includes('AF_initDataCallback');
	const loggy = (t) => ['test', '開始', '完了', '✅', '❌', 'Logger', 'エラー'].some((k) => t.includes(k));
	let best = '';
	const consider = (el, min) => {
		const text = el.textContent || el.innerText || '';
		if (text.length > best.length && text.length > min && !noisy(text) && loggy(text)) best = text;
	};
	const scan = (selectors, inner, min) => {
		for (const sel of selectors) {
			try {
				for (const root of document.querySelectorAll(sel)) {
					if (inner) root.querySelectorAll(inner).forEach((el) => consider(el, min));
					else consider(root, min);
				}
			} catch (e) {}
		}
	};

	scan(
		['[class*="log-panel"]', '[class*="execution-log"]', '[aria-label*="実行ログ"]',
		 '[aria-label*="Execution log"]', '[role="dialog"]', '[role="complementary"]'],
		'pre, code, textarea, [role="textbox"], [role="log"], div',
		50,
	);
	if (best.length < 100) {
		scan(
			['[class*="log"]', '[class*="execution"]', '[aria-label*="ログ"]', '[aria-label*="log"]',
			 '[role="log"]', '[role="textbox"][readonly]', 'pre', 'code', 'textarea[readonly]'],
			null,
			50,
		);
	}
	if (best.length < 100) {
		scan(['pre', 'code', 'textarea', '[role="textbox"]'], null, 200);
	}
	return best;
}"#;

/// Builds a predicate that is true once the scraped log shows any of
/// `markers` and is no longer loading.
pub fn log_settled_predicate() -> String {
	format!(
		r#"({{ markers, loading }}) => {{
	const text = ({EXTRACT_LOG})();
	return text.length > 0 && !text.includes(loading) && markers.some((m) => text.includes(m));
}}"#
	)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn settled_predicate_embeds_extractor() {
		let predicate = log_settled_predicate();
		assert!(predicate.starts_with("({ markers, loading }) =>"));
		assert!(predicate.contains("window.WIZ_global_data"));
	}
}
